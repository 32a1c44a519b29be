//! Transport that records messages instead of sending them.

use tokio::sync::Mutex;
use tracing::info;

use crate::{DeliveryError, DeliveryReceipt, DeliveryTransport, normalize_phone};

/// A message captured by [`DryRunTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMessage {
    pub to: String,
    pub body: String,
}

/// Logs and keeps every message; never contacts a gateway.
pub struct DryRunTransport {
    country_code: String,
    sent: Mutex<Vec<CapturedMessage>>,
}

impl DryRunTransport {
    pub fn new(country_code: &str) -> Self {
        Self {
            country_code: country_code.to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Messages captured so far.
    pub async fn captured(&self) -> Vec<CapturedMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl DeliveryTransport for DryRunTransport {
    fn transport_type(&self) -> &str {
        "dry-run"
    }

    async fn deliver(&self, phone: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let to = normalize_phone(phone, &self.country_code)?;
        info!(to = %to, "[dry-run] {body}");

        let mut sent = self.sent.lock().await;
        sent.push(CapturedMessage {
            to: to.clone(),
            body: body.to_string(),
        });
        Ok(DeliveryReceipt {
            id: format!("dry-run-{}", sent.len()),
            to,
        })
    }
}
