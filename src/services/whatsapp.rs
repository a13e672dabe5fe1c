use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::config::WhatsAppSettings;

#[derive(Debug, Error)]
#[error("WhatsApp API error: {0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub status: String,
    pub message_id: Option<String>,
    pub timestamp: String,
}

/// Outbound messaging transport. The engine only ever needs this one
/// call; the provider-specific payload shape stays behind it.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> Result<SendReceipt, TransportError>;
}

pub struct WhatsAppClient {
    pub client: Client,
    pub settings: WhatsAppSettings,
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_message(&self, to: &str, body: &str) -> Result<SendReceipt, TransportError> {
        let to = normalize_phone(to);
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });

        let url = format!(
            "{}/{}/messages",
            self.settings.base_url, self.settings.phone_number_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let data: Value = response
            .json()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        if !status.is_success() {
            let provider_message = data
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            error!(%to, http_status = %status, "WhatsApp message failed");
            return Err(TransportError(provider_message.to_string()));
        }

        let message_id = data
            .pointer("/messages/0/id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        info!(%to, ?message_id, "WhatsApp message sent");

        Ok(SendReceipt {
            status: "sent".to_string(),
            message_id,
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
    }
}

/// Strips non-digits, trims leading zeros, and prefixes bare 10-digit
/// numbers with a country code.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.len() == 10 && !trimmed.starts_with('1') {
        format!("1{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Validates a Meta `X-Hub-Signature-256` header (`sha256=<hex>`)
/// against the raw request body, in constant time.
pub fn verify_webhook_signature(app_secret: &str, signature: &str, payload: &[u8]) -> bool {
    if app_secret.is_empty() {
        return false;
    }
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided.as_slice()).into()
}

/// Test transport: records every send and can be armed to fail.
#[derive(Default)]
pub struct MockMessenger {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub fail_with: std::sync::Mutex<Option<String>>,
}

impl MockMessenger {
    pub fn failing(message: &str) -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail_with: std::sync::Mutex::new(Some(message.to_string())),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_message(&self, to: &str, body: &str) -> Result<SendReceipt, TransportError> {
        if let Some(msg) = self.fail_with.lock().unwrap().clone() {
            return Err(TransportError(msg));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(SendReceipt {
            status: "sent".to_string(),
            message_id: Some(format!("mock-{}", self.sent_count())),
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_formatting_and_leading_zeros() {
        assert_eq!(normalize_phone("+1 (555) 867-5309"), "15558675309");
        assert_eq!(normalize_phone("005558675309"), "15558675309");
    }

    #[test]
    fn normalize_adds_country_code_to_bare_ten_digits() {
        assert_eq!(normalize_phone("5558675309"), "15558675309");
    }

    #[test]
    fn normalize_leaves_international_numbers_alone() {
        assert_eq!(normalize_phone("447911123456"), "447911123456");
    }

    #[test]
    fn signature_round_trip() {
        let secret = "app-secret";
        let body = br#"{"object":"whatsapp_business_account"}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let header = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(verify_webhook_signature(secret, &header, body));
        assert!(!verify_webhook_signature(secret, &header, b"tampered"));
        assert!(!verify_webhook_signature("other", &header, body));
    }

    #[test]
    fn signature_rejects_malformed_header() {
        assert!(!verify_webhook_signature("secret", "md5=abc", b"x"));
        assert!(!verify_webhook_signature("secret", "sha256=nothex", b"x"));
        assert!(!verify_webhook_signature("", "sha256=00", b"x"));
    }
}
