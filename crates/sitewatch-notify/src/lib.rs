//! sitewatch-notify: turns alert events into mail.
//!
//! [`render`] builds the subject/body pair for an [`AlertEvent`], the
//! [`Notifier`] fans it out to every recipient through a [`Mailer`], and
//! [`CommandMailer`] delivers through a mail(1)-compatible program.
//!
//! [`AlertEvent`]: sitewatch_core::AlertEvent

pub mod error;
pub mod format;
pub mod mailer;
pub mod message;
pub mod notifier;

pub use error::{NotifyError, NotifyResult};
pub use format::{format_duration, format_timestamp};
pub use mailer::{CommandMailer, DeliveryFuture, Mailer};
pub use message::{render, Message};
pub use notifier::Notifier;
