use tokio::sync::mpsc;
use tracing::debug;

use tenant_model::TenantKey;

/// Synthetic notification forcing a reconciliation pass for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub key: TenantKey,
}

/// Sending half of the supervisor's self-addressed queue.
#[derive(Clone)]
pub struct FeedbackSender {
    tx: mpsc::UnboundedSender<Feedback>,
}

impl FeedbackSender {
    /// Enqueue a pass for `key`; returns `false` once the dispatcher is gone.
    pub fn send(&self, key: TenantKey) -> bool {
        match self.tx.send(Feedback { key }) {
            Ok(()) => true,
            Err(mpsc::error::SendError(Feedback { key })) => {
                debug!(tenant = %key, "feedback dropped, dispatcher stopped");
                false
            }
        }
    }
}

pub struct FeedbackReceiver {
    rx: mpsc::UnboundedReceiver<Feedback>,
}

impl FeedbackReceiver {
    pub async fn recv(&mut self) -> Option<Feedback> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Feedback> {
        self.rx.try_recv().ok()
    }
}

/// Create the feedback queue.
///
/// Unbounded so that a failing runtime never waits on the dispatcher it reports to.
pub fn channel() -> (FeedbackSender, FeedbackReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FeedbackSender { tx }, FeedbackReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order() {
        let (tx, mut rx) = channel();
        assert!(tx.send(TenantKey::new("tenants", "a")));
        assert!(tx.send(TenantKey::new("tenants", "b")));

        assert_eq!(rx.recv().await.unwrap().key.name, "a");
        assert_eq!(rx.recv().await.unwrap().key.name, "b");
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn send_after_receiver_dropped_reports_false() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(!tx.send(TenantKey::new("tenants", "a")));
    }
}
