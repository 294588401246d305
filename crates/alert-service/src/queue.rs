use ara_core::Alert;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Process-wide alert queue shared by scoring calls (writers) and delivery
/// subscribers (readers). Mutex-owned so concurrent scoring calls interleave
/// safely; ordering within one push is preserved, interleaving across
/// concurrent requests is allowed. Each alert is popped exactly once.
#[derive(Default)]
pub struct AlertQueue {
    inner: Mutex<VecDeque<Alert>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_all(&self, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }
        let mut q = self.inner.lock().await;
        q.extend(alerts);
        tracing::debug!(pending = q.len(), "alerts enqueued");
    }

    /// FIFO pop; None when the queue is drained.
    pub async fn pop(&self) -> Option<Alert> {
        self.inner.lock().await.pop_front()
    }

    pub async fn pending(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ara_core::{Market, ALERT_KIND};
    use chrono::NaiveDate;

    fn alert(ticker: &str) -> Alert {
        Alert {
            ticker: ticker.to_string(),
            proba: 0.9,
            timestamp: chrono::Utc::now(),
            kind: ALERT_KIND.to_string(),
            market: Market::Id,
            asof: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn pops_in_fifo_order_exactly_once() {
        let queue = AlertQueue::new();
        queue.push_all(vec![alert("A.JK"), alert("B.JK")]).await;
        queue.push_all(vec![alert("C.JK")]).await;

        assert_eq!(queue.pending().await, 3);
        assert_eq!(queue.pop().await.unwrap().ticker, "A.JK");
        assert_eq!(queue.pop().await.unwrap().ticker, "B.JK");
        assert_eq!(queue.pop().await.unwrap().ticker, "C.JK");
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn empty_push_is_a_no_op() {
        let queue = AlertQueue::new();
        queue.push_all(Vec::new()).await;
        assert_eq!(queue.pending().await, 0);
    }
}
