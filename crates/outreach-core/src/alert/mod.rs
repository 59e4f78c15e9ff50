//! Alerting collaborator.
//!
//! `notify` is fire-and-forget: it returns immediately and never reports
//! failure to the caller, so a broken webhook can't abort a pool transition.

mod webhook;

pub use webhook::WebhookAlerter;

/// Best-effort operator notification sink.
pub trait Alerter: Send + Sync {
    fn notify(&self, message: &str);
}

/// Alerter that only writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "outreach::alert", "🚨 {}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Alerter;
    use parking_lot::Mutex;

    /// Records every alert for assertions.
    #[derive(Default)]
    pub struct RecordingAlerter {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingAlerter {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }
    }

    impl Alerter for RecordingAlerter {
        fn notify(&self, message: &str) {
            self.messages.lock().push(message.to_string());
        }
    }
}
