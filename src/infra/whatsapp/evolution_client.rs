use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::core::notifications::{NotificationError, NotificationGateway};

/// WhatsApp messaging through an Evolution API instance.
pub struct EvolutionClient {
    client: Client,
    base_url: String,
    instance: String,
}

impl EvolutionClient {
    pub fn new(base_url: &str, api_key: &str, instance: &str) -> Result<Self, NotificationError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|e| NotificationError::Transport(e.to_string()))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            instance: instance.to_string(),
        })
    }

    fn send_text_url(&self) -> String {
        format!("{}/message/sendText/{}", self.base_url, self.instance)
    }
}

/// Phone numbers arrive as "+55 (11) 99999-0000" and the like; the API wants digits.
fn normalize_number(recipient: &str) -> Result<String, NotificationError> {
    let digits: String = recipient.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(NotificationError::InvalidRecipient(recipient.to_string()));
    }
    Ok(digits)
}

#[async_trait]
impl NotificationGateway for EvolutionClient {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
        let number = normalize_number(recipient)?;

        let response = self
            .client
            .post(self.send_text_url())
            .json(&json!({ "number": number, "text": text }))
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        tracing::debug!(number = %number, "WhatsApp message accepted");
        Ok(())
    }
}

/// Stand-in used when no gateway is configured. Every send reports `NotConfigured`.
pub struct DisabledGateway;

#[async_trait]
impl NotificationGateway for DisabledGateway {
    async fn send_message(&self, _recipient: &str, _text: &str) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured)
    }
}
