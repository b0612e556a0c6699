//! LogTransport - emits notifications via tracing

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::app::DeliveryError;
use crate::notifier::{DeliveryReceipt, Transport};

/// Transport used when no host delivery channel is configured.
#[derive(Debug, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt, DeliveryError> {
        info!(destination = %destination, "Notification:\n{}", message);
        Ok(DeliveryReceipt {
            destination: destination.to_string(),
            delivered_at: Utc::now(),
        })
    }
}
