//! LINE Messaging API client and webhook signature verification.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, warn};

use brain_core::{Error, Result};

/// Reply and push endpoints.
pub const LINE_API_URL: &str = "https://api.line.me/v2/bot";

/// Message content endpoint.
pub const LINE_DATA_API_URL: &str = "https://api-data.line.me/v2/bot";

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Content download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Reply sent for message kinds other than text and image.
pub const UNSUPPORTED_REPLY: &str = "ขออภัย รองรับเฉพาะข้อความและรูปภาพ";

/// Reply sent when processing a message fails.
pub const FAILURE_REPLY: &str = "❌ เกิดข้อผิดพลาด กรุณาลองใหม่";

/// Suffix of the confirmation reply, after the content-type emoji.
pub const SAVED_REPLY_SUFFIX: &str = " บันทึกแล้ว!";

type HmacSha256 = Hmac<Sha256>;

/// Check a delivery signature.
///
/// The signature is base64(HMAC-SHA256(secret, body)). Comparison runs in
/// constant time; an undecodable signature simply fails.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature LINE would send for `body`.
pub fn sign_body(channel_secret: &str, body: &[u8]) -> String {
    match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(body);
            BASE64.encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    }
}

/// Confirmation text for a saved item, e.g. `🔗 บันทึกแล้ว!`.
pub fn saved_reply(emoji: &str) -> String {
    format!("{}{}", emoji, SAVED_REPLY_SUFFIX)
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send a single text reply using a one-shot reply token.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Declared MIME type of a message's binary content, if the platform reports one.
    async fn content_type(&self, message_id: &str) -> Result<Option<String>>;

    /// Download a message's binary content.
    async fn download_content(&self, message_id: &str) -> Result<Bytes>;
}

/// LINE client configuration.
#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: String,
    pub api_url: String,
    pub data_api_url: String,
    pub timeout_seconds: u64,
}

impl LineConfig {
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            api_url: LINE_API_URL.to_string(),
            data_api_url: LINE_DATA_API_URL.to_string(),
            timeout_seconds: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }

    /// Point both endpoints at one base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_url = url.clone();
        self.data_api_url = url;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// HTTP client for the LINE Messaging API.
pub struct LineClient {
    client: Client,
    config: LineConfig,
}

impl LineClient {
    pub fn new(config: LineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Messaging(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.channel_access_token)
    }

    fn content_url(&self, message_id: &str) -> String {
        format!(
            "{}/message/{}/content",
            self.config.data_api_url.trim_end_matches('/'),
            message_id
        )
    }
}

#[async_trait]
impl MessagingClient for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let url = format!("{}/message/reply", self.config.api_url.trim_end_matches('/'));
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Reply request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!(
                subsystem = "pipeline",
                component = "line",
                op = "reply",
                status = status.as_u16(),
                "LINE rejected reply"
            );
            return Err(Error::Messaging(format!(
                "Reply failed with {}: {}",
                status, detail
            )));
        }

        debug!(subsystem = "pipeline", component = "line", op = "reply", "Reply sent");
        Ok(())
    }

    async fn content_type(&self, message_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .head(self.content_url(message_id))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Content type request failed: {}", e)))?;

        Ok(response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    async fn download_content(&self, message_id: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(self.content_url(message_id))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Failed to download image: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Messaging(format!(
                "Failed to download image: {}",
                status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Messaging(format!("Failed to read image body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"events":[]}"#;
        let signature = sign_body("secret", body);
        assert!(verify_signature("secret", body, &signature));
    }

    #[test]
    fn test_signature_rejects_other_secret_or_body() {
        let body = br#"{"events":[]}"#;
        let signature = sign_body("secret", body);
        assert!(!verify_signature("other", body, &signature));
        assert!(!verify_signature("secret", br#"{"events":[1]}"#, &signature));
    }

    #[test]
    fn test_signature_rejects_garbage() {
        assert!(!verify_signature("secret", b"body", "not base64!!"));
        assert!(!verify_signature("secret", b"body", ""));
    }

    #[test]
    fn test_known_signature_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let signature = "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=";
        assert!(verify_signature(
            "key",
            b"The quick brown fox jumps over the lazy dog",
            signature
        ));
    }

    #[test]
    fn test_saved_reply() {
        assert_eq!(saved_reply("🔗"), "🔗 บันทึกแล้ว!");
    }

    #[test]
    fn test_config_base_url_override() {
        let config = LineConfig::new("token").with_base_url("http://localhost:9999");
        assert_eq!(config.api_url, "http://localhost:9999");
        assert_eq!(config.data_api_url, "http://localhost:9999");
        assert_eq!(config.timeout_seconds, DEFAULT_DOWNLOAD_TIMEOUT_SECS);
    }
}
