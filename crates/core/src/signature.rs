//! Webhook request signing.
//!
//! The signature header has the form `t=<unix seconds>,v0=<hex hmac>`, where
//! the MAC is HMAC-SHA256 over `"<t>.<raw body>"`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: u64 = 30 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("malformed signature header: {0}")]
    Malformed(String),
    #[error("timestamp header does not match signed timestamp")]
    TimestampMismatch,
    #[error("signature timestamp is older than {tolerance_secs}s")]
    Expired { tolerance_secs: u64 },
    #[error("signature does not match payload")]
    Mismatch,
    #[error("webhook secret is unusable")]
    InvalidSecret,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// `t` exactly as sent; this text is what gets signed.
    pub timestamp_text: String,
    pub digest: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(raw: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut digest = None;

        for part in raw.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    let text = value.trim();
                    let parsed = text.parse::<i64>().map_err(|_| {
                        SignatureError::Malformed(format!("invalid timestamp `{text}`"))
                    })?;
                    timestamp = Some((parsed, text.to_string()));
                }
                "v0" => {
                    let decoded = hex::decode(value.trim())
                        .map_err(|_| SignatureError::Malformed("v0 is not hex".to_string()))?;
                    digest = Some(decoded);
                }
                _ => {}
            }
        }

        match (timestamp, digest) {
            (Some((timestamp, timestamp_text)), Some(digest)) => {
                Ok(Self { timestamp, timestamp_text, digest })
            }
            (None, _) => Err(SignatureError::Malformed("missing t=".to_string())),
            (_, None) => Err(SignatureError::Malformed("missing v0=".to_string())),
        }
    }
}

pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: u64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: SecretString, tolerance_secs: u64) -> Self {
        Self { secret, tolerance_secs }
    }

    /// Checks the signature header against the raw body. When a separate
    /// timestamp header is sent it must agree with the signed timestamp.
    /// Timestamps in the future are accepted.
    pub fn verify(
        &self,
        signature_header: Option<&str>,
        timestamp_header: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let raw = signature_header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingSignature)?;
        let header = SignatureHeader::parse(raw)?;

        if let Some(sent) = timestamp_header.map(str::trim).filter(|value| !value.is_empty()) {
            if sent != header.timestamp_text {
                return Err(SignatureError::TimestampMismatch);
            }
        }

        let age = now.timestamp().saturating_sub(header.timestamp);
        if age > 0 && age.unsigned_abs() > self.tolerance_secs {
            return Err(SignatureError::Expired { tolerance_secs: self.tolerance_secs });
        }

        let mac = self.mac(&header.timestamp_text, body)?;
        mac.verify_slice(&header.digest).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the `t=…,v0=…` header value for `body` signed at `timestamp`.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(&timestamp.to_string(), body)?;
        Ok(format!("t={timestamp},v0={}", hex::encode(mac.finalize().into_bytes())))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}
