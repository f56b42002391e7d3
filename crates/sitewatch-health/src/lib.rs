//! sitewatch-health: probing and alert debouncing.
//!
//! # Architecture
//!
//! ```text
//! Monitor::run_checks
//!   ├── ExecutionLock::acquire        (fails fast if another run is live)
//!   ├── StatusStore::load
//!   ├── per target
//!   │   ├── Prober::probe → HttpCode  (retries connection failures only)
//!   │   ├── TransitionEngine::apply   (new record + optional alert)
//!   │   └── Notifier::notify
//!   └── StatusStore::save             (whole-file replace)
//!
//! Monitor::run_summary
//!   └── StatusStore::load → one consolidated alert for targets past grace
//! ```
//!
//! # Debouncing
//!
//! A DOWN alert fires exactly once per down streak, on the observation that
//! brings the failure count to `grace_period`. An UP alert fires only when
//! the streak that just ended had reached that threshold, so DOWN and UP
//! alerts always come in pairs.

pub mod checker;
pub mod error;
pub mod monitor;
pub mod transition;

pub use checker::{FetchFuture, Prober, ReqwestTransport, Transport};
pub use error::{MonitorError, MonitorResult};
pub use monitor::{Clock, Monitor, RunReport};
pub use transition::{Transition, TransitionEngine};
