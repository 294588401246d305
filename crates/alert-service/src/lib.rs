//! Alert emission and delivery: threshold-crossing detection, the shared
//! FIFO queue drained by subscribers, and push channels for side delivery.

mod channel;
mod emitter;
mod queue;

pub use channel::{AlertChannel, AlertDeliveryError, AlertDispatcher, WebhookChannel};
pub use emitter::emit;
pub use queue::AlertQueue;

/// Delivery configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Inclusive probability floor for emitting an alert.
    pub threshold: f64,
    pub webhook_url: Option<String>,
}

impl AlertConfig {
    pub fn from_env() -> Self {
        let threshold = std::env::var("ARA_ALERT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.80);
        Self {
            threshold,
            webhook_url: std::env::var("ARA_ALERT_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}
