//! Outbound text-message delivery.
//!
//! [`DeliveryTransport`] is the seam the scheduler sends through.
//! [`twilio::TwilioSms`] talks to the Twilio Messages API;
//! [`dry_run::DryRunTransport`] only records what would have been sent.

pub mod dry_run;
pub mod twilio;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dry_run::DryRunTransport;
pub use twilio::{TwilioOptions, TwilioSms};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid recipient: {0:?}")]
    InvalidRecipient(String),
    #[error("delivery timed out after {0}s")]
    Timeout(u64),
    #[error("SMS gateway not configured: missing {0}")]
    NotConfigured(&'static str),
}

/// Acknowledgement returned by the gateway for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Gateway-assigned message ID.
    pub id: String,
    /// Normalized recipient the message was addressed to.
    pub to: String,
}

/// Trait for transports that deliver a text body to a phone number.
///
/// `phone` is passed as read from the source; implementations normalize it
/// with [`normalize_phone`] before sending.
#[async_trait::async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Short identifier used in logs (e.g. "twilio", "dry-run").
    fn transport_type(&self) -> &str;

    async fn deliver(&self, phone: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Normalize a phone number to `+<country><number>`.
///
/// Every non-digit is stripped. Numbers that already start with the country
/// code only get the `+` prefix.
pub fn normalize_phone(phone: &str, country_code: &str) -> Result<String, DeliveryError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(DeliveryError::InvalidRecipient(phone.to_string()));
    }
    if digits.starts_with(country_code) {
        Ok(format!("+{digits}"))
    } else {
        Ok(format!("+{country_code}{digits}"))
    }
}
