//! Twilio Messages API client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{DeliveryError, DeliveryReceipt, DeliveryTransport, normalize_phone};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number registered with Twilio.
    pub from_number: String,
    /// Country calling code for local recipient numbers.
    pub country_code: String,
}

impl TwilioOptions {
    /// Build options from optional settings, naming the first missing one.
    pub fn from_parts(
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        from_number: Option<&str>,
        country_code: &str,
    ) -> Result<Self, DeliveryError> {
        Ok(Self {
            account_sid: account_sid
                .ok_or(DeliveryError::NotConfigured("account_sid"))?
                .to_string(),
            auth_token: auth_token
                .ok_or(DeliveryError::NotConfigured("auth_token"))?
                .to_string(),
            from_number: from_number
                .ok_or(DeliveryError::NotConfigured("from_number"))?
                .to_string(),
            country_code: country_code.to_string(),
        })
    }
}

/// Message resource returned on success.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// SMS transport backed by the Twilio REST API.
pub struct TwilioSms {
    client: Client,
    base_url: String,
    options: TwilioOptions,
}

impl TwilioSms {
    pub fn new(options: TwilioOptions) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            options,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.options.account_sid
        )
    }

    /// Form fields for one outbound message.
    fn form<'a>(&'a self, to: &'a str, body: &'a str) -> [(&'static str, &'a str); 3] {
        [
            ("To", to),
            ("From", self.options.from_number.as_str()),
            ("Body", body),
        ]
    }
}

#[async_trait::async_trait]
impl DeliveryTransport for TwilioSms {
    fn transport_type(&self) -> &str {
        "twilio"
    }

    async fn deliver(&self, phone: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let to = normalize_phone(phone, &self.options.country_code)?;
        debug!(to = %to, message_length = body.len(), "Sending SMS");

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&self.form(&to, body))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TwilioErrorBody>(&error_body) {
                Ok(TwilioErrorBody {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{message} (code {code})"),
                Ok(TwilioErrorBody {
                    message: Some(message),
                    ..
                }) => message,
                _ => error_body,
            };
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let message: MessageResource = resp.json().await?;
        info!(
            sid = %message.sid,
            status = message.status.as_deref().unwrap_or("unknown"),
            "SMS accepted by gateway"
        );
        Ok(DeliveryReceipt {
            id: message.sid,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TwilioOptions {
        TwilioOptions {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            from_number: "+15550001111".into(),
            country_code: "57".into(),
        }
    }

    #[test]
    fn test_messages_url() {
        let sms = TwilioSms::new(options()).unwrap();
        assert_eq!(
            sms.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_form_fields() {
        let sms = TwilioSms::new(options()).unwrap();
        let form = sms.form("+573001234567", "hola");
        assert_eq!(
            form,
            [("To", "+573001234567"), ("From", "+15550001111"), ("Body", "hola")]
        );
    }

    #[test]
    fn test_options_from_parts_names_missing_field() {
        let err = TwilioOptions::from_parts(Some("AC1"), None, Some("+1555"), "57").unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured("auth_token")));

        let ok = TwilioOptions::from_parts(Some("AC1"), Some("t"), Some("+1555"), "57").unwrap();
        assert_eq!(ok.from_number, "+1555");
    }

    #[tokio::test]
    async fn test_invalid_recipient_never_hits_network() {
        let sms = TwilioSms::new(options())
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let result = sms.deliver("sin número", "hola").await;
        assert!(matches!(result, Err(DeliveryError::InvalidRecipient(_))));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_http_error() {
        let sms = TwilioSms::new(options())
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let result = sms.deliver("3001234567", "hola").await;
        assert!(matches!(result, Err(DeliveryError::Http(_))));
    }
}
