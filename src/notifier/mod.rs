//! Fan-out delivery of notifications.
//!
//! ```text
//! message → Notifier → Transport::send(d) for every destination d
//! ```
//!
//! Each destination is attempted independently; failures are logged and collected
//! in the [`FanoutReport`], never propagated.

mod log;
mod message;
mod webhook;

pub use self::log::LogTransport;
pub use self::message::{format_message, DEFAULT_BANNER};
pub use self::webhook::WebhookTransport;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::app::DeliveryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub destination: String,
    pub delivered_at: DateTime<Utc>,
}

/// Host-supplied "send message to destination" capability.
///
/// Calling it repeatedly with the same message is allowed; no dedup is expected.
#[async_trait]
pub trait Transport {
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt, DeliveryError>;
}

#[derive(Debug, Default)]
pub struct FanoutReport {
    pub delivered: Vec<DeliveryReceipt>,
    pub failed: Vec<DeliveryError>,
}

impl FanoutReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport + Send + Sync>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>) -> Self {
        Self { transport }
    }

    pub async fn notify(&self, destinations: &[String], message: &str) -> FanoutReport {
        if destinations.is_empty() {
            info!("No destinations registered, notification not sent:\n{}", message);
            return FanoutReport::default();
        }

        let sends = destinations
            .iter()
            .map(|destination| self.transport.send(destination, message));

        let mut report = FanoutReport::default();
        for result in join_all(sends).await {
            match result {
                Ok(receipt) => {
                    debug!(destination = %receipt.destination, "Notification delivered");
                    report.delivered.push(receipt);
                }
                Err(e) => {
                    warn!("{}", e);
                    report.failed.push(e);
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Fan-out complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::RecordingTransport;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_destinations_is_noop() {
        let transport = Arc::new(RecordingTransport::new());
        let notifier = Notifier::new(transport.clone());

        let report = notifier.notify(&[], "hello").await;
        assert_eq!(report.attempted(), 0);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_destination() {
        let transport = Arc::new(RecordingTransport::failing_for(["d1"]));
        let notifier = Notifier::new(transport.clone());

        let report = notifier.notify(&ids(&["d1", "d2"]), "hello").await;

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.delivered.len(), 1);
        assert_eq!(report.delivered[0].destination, "d2");
        assert_eq!(
            report.failed,
            vec![DeliveryError::Failed {
                destination: "d1".into(),
                reason: "unreachable".into()
            }]
        );
        assert_eq!(transport.attempts(), ids(&["d1", "d2"]));
        assert_eq!(transport.sent(), vec![("d2".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let notifier = Notifier::new(Arc::new(LogTransport::new()));
        let report = notifier.notify(&ids(&["a", "b"]), "hello").await;
        assert_eq!(report.delivered.len(), 2);
        assert!(report.failed.is_empty());
    }
}
