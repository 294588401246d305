use ara_core::Alert;
use async_trait::async_trait;
use std::sync::Arc;

/// Errors from push-delivery channels.
#[derive(Debug, thiserror::Error)]
pub enum AlertDeliveryError {
    #[error("webhook error: {0}")]
    Webhook(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Trait for push-delivery channels.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), AlertDeliveryError>;
    fn name(&self) -> &str;
}

/// Generic JSON webhook channel.
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<(), AlertDeliveryError> {
        self.client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .map_err(|e| AlertDeliveryError::Webhook(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// Dispatches each alert to every configured channel, fire-and-forget, with
/// failures logged rather than propagated.
pub struct AlertDispatcher {
    channels: Arc<Vec<Box<dyn AlertChannel>>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        if channels.is_empty() {
            tracing::info!("no alert channels configured (set ARA_ALERT_WEBHOOK_URL)");
        }
        Self {
            channels: Arc::new(channels),
        }
    }

    pub fn from_config(config: &crate::AlertConfig) -> Self {
        let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();
        if let Some(url) = &config.webhook_url {
            channels.push(Box::new(WebhookChannel::new(url.clone())));
            tracing::info!("webhook alert channel enabled");
        }
        Self::new(channels)
    }

    pub fn dispatch(&self, alerts: Vec<Alert>) {
        if self.channels.is_empty() || alerts.is_empty() {
            return;
        }
        let channels = self.channels.clone();
        tokio::spawn(async move {
            for alert in &alerts {
                for channel in channels.iter() {
                    match channel.send(alert).await {
                        Ok(()) => tracing::debug!(channel = channel.name(), "alert delivered"),
                        Err(e) => {
                            tracing::warn!(channel = channel.name(), error = %e, "alert delivery failed")
                        }
                    }
                }
            }
        });
    }

    /// Deliver to every channel, awaiting completion.
    pub async fn dispatch_async(&self, alerts: &[Alert]) {
        for alert in alerts {
            for channel in self.channels.iter() {
                if let Err(e) = channel.send(alert).await {
                    tracing::warn!(channel = channel.name(), error = %e, "alert delivery failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ara_core::{Market, ALERT_KIND};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        sent: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AlertChannel for CountingChannel {
        async fn send(&self, _alert: &Alert) -> Result<(), AlertDeliveryError> {
            if self.fail {
                return Err(AlertDeliveryError::Webhook("boom".into()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn alert() -> Alert {
        Alert {
            ticker: "BBCA.JK".into(),
            proba: 0.9,
            timestamp: chrono::Utc::now(),
            kind: ALERT_KIND.to_string(),
            market: Market::Id,
            asof: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn delivers_to_all_channels_and_survives_failures() {
        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![
            Box::new(CountingChannel {
                sent: sent.clone(),
                fail: false,
            }),
            Box::new(CountingChannel {
                sent: sent.clone(),
                fail: true,
            }),
            Box::new(CountingChannel {
                sent: sent.clone(),
                fail: false,
            }),
        ]);

        dispatcher.dispatch_async(&[alert(), alert()]).await;
        // 2 alerts x 2 healthy channels
        assert_eq!(sent.load(Ordering::SeqCst), 4);
    }
}
