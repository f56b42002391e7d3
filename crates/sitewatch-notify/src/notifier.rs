//! Fan-out of alert events to the configured recipients.

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, info, warn};

use sitewatch_core::AlertEvent;

use crate::mailer::Mailer;
use crate::message::render;

/// Renders alert events and mails them to every recipient.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    recipients: Vec<String>,
    tz: Tz,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, recipients: Vec<String>, tz: Tz) -> Self {
        Self {
            mailer,
            recipients,
            tz,
        }
    }

    /// Send `event` to each recipient once. A failed delivery is logged and
    /// does not stop the remaining ones. Returns the number delivered.
    pub async fn notify(&self, event: &AlertEvent) -> usize {
        if self.recipients.is_empty() {
            warn!(kind = event.kind(), "no recipients configured, alert dropped");
            return 0;
        }

        let message = render(event, self.tz);
        let mut delivered = 0;
        for recipient in &self.recipients {
            match self.mailer.deliver(recipient, &message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(%recipient, kind = event.kind(), error = %e, "alert delivery failed");
                }
            }
        }

        info!(
            kind = event.kind(),
            subject = %message.subject,
            delivered,
            recipients = self.recipients.len(),
            "alert sent"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use sitewatch_core::HttpCode;

    use crate::error::NotifyError;
    use crate::mailer::DeliveryFuture;
    use crate::message::Message;

    /// Records deliveries; fails for recipients listed in `reject`.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, Message)>>,
        reject: Vec<String>,
    }

    impl Mailer for RecordingMailer {
        fn deliver<'a>(&'a self, recipient: &'a str, message: &'a Message) -> DeliveryFuture<'a> {
            Box::pin(async move {
                if self.reject.iter().any(|r| r == recipient) {
                    return Err(NotifyError::EmptyCommand);
                }
                self.sent
                    .lock()
                    .unwrap()
                    .push((recipient.to_string(), message.clone()));
                Ok(())
            })
        }
    }

    fn down_event() -> AlertEvent {
        AlertEvent::Down {
            target: "https://x".to_string(),
            since: 0,
            code: HttpCode(500),
        }
    }

    #[tokio::test]
    async fn sends_to_every_recipient() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(
            mailer.clone(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()],
            chrono_tz::UTC,
        );

        assert_eq!(notifier.notify(&down_event()).await, 2);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "a@example.com");
        assert_eq!(sent[1].0, "b@example.com");
        assert_eq!(sent[0].1.subject, "🔴 [x] DOWN Alert");
    }

    #[tokio::test]
    async fn failed_recipient_does_not_block_others() {
        let mailer = Arc::new(RecordingMailer {
            reject: vec!["a@example.com".to_string()],
            ..Default::default()
        });
        let notifier = Notifier::new(
            mailer.clone(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()],
            chrono_tz::UTC,
        );

        assert_eq!(notifier.notify(&down_event()).await, 1);
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "b@example.com");
    }

    #[tokio::test]
    async fn no_recipients_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(mailer.clone(), Vec::new(), chrono_tz::UTC);

        assert_eq!(notifier.notify(&down_event()).await, 0);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
