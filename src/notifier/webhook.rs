//! WebhookTransport - posts notifications to an HTTP endpoint

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use crate::app::{DeliveryError, Result};
use crate::notifier::{DeliveryReceipt, Transport};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    destination: &'a str,
    message: &'a str,
}

/// Hands each message to a host-side relay as `{"destination", "message"}` JSON.
pub struct WebhookTransport {
    client: Client,
    endpoint: String,
}

impl WebhookTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn send(
        &self,
        destination: &str,
        message: &str,
    ) -> std::result::Result<DeliveryReceipt, DeliveryError> {
        let failed = |reason: String| DeliveryError::Failed {
            destination: destination.to_string(),
            reason,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&WebhookPayload {
                destination,
                message,
            })
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("relay answered HTTP {}", status.as_u16())));
        }

        Ok(DeliveryReceipt {
            destination: destination.to_string(),
            delivered_at: Utc::now(),
        })
    }
}
