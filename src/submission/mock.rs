use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::transport::{
    Notification, NotificationError, Notifier, ServerAck, SubmissionPayload, Transport,
    TransportError,
};

/// In-memory transport that records every payload it accepts.
#[derive(Debug, Default)]
pub struct MockTransport {
    offline: AtomicBool,
    fail_next: AtomicUsize,
    attempts: AtomicUsize,
    delay: Option<Duration>,
    delivered: Mutex<Vec<SubmissionPayload>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` calls, then recover.
    pub fn fail_times(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<SubmissionPayload> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn delivered_sequences(&self) -> Vec<u64> {
        self.delivered().iter().map(|p| p.sequence).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ServerAck, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("mock transport is offline".to_string()));
        }
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Rejected {
                status: 503,
                message: "mock failure".to_string(),
            });
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(payload.clone());
        }
        Ok(ServerAck::ok(serde_json::json!({ "sequence": payload.sequence })))
    }
}

/// Notifier that keeps sent messages, or fails every send when told to.
#[derive(Debug, Default)]
pub struct MockNotifier {
    failing: AtomicBool,
    sent: Mutex<Vec<Notification>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError("mailbox unavailable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(sequence: u64) -> SubmissionPayload {
        SubmissionPayload {
            target: "mock".to_string(),
            sequence,
            body: json!({}),
        }
    }

    #[tokio::test]
    async fn test_fail_times_then_recover() {
        let transport = MockTransport::new();
        transport.fail_times(2);
        assert!(transport.submit(&payload(1)).await.is_err());
        assert!(transport.submit(&payload(1)).await.is_err());
        assert!(transport.submit(&payload(1)).await.is_ok());
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.delivered_sequences(), vec![1]);
    }

    #[tokio::test]
    async fn test_offline_transport() {
        let transport = MockTransport::new();
        transport.set_offline(true);
        let err = transport.submit(&payload(1)).await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
        assert!(transport.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_failing_notifier() {
        let notifier = MockNotifier::failing();
        let notification = Notification {
            to: "a@x.io".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        assert!(notifier.send(&notification).await.is_err());
        assert!(notifier.sent().is_empty());
    }
}
