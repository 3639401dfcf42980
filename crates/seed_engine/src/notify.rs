use seed_logging::seed_info;

/// Fire-and-forget user alert.
pub trait NotificationSink: Send + Sync {
    fn post(&self, title: &str, body: &str);
}

/// Sink for hosts without a notification center: notifications go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn post(&self, title: &str, body: &str) {
        seed_info!("Notification: {} - {}", title, body);
    }
}
