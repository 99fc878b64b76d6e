//! Opaque page cursors for consumer enumeration
//!
//! A cursor is the JSON form of a [`ConsumerCursor`] followed by an
//! HMAC-SHA256 tag truncated to 16 bytes, base64url-encoded without padding.
//! Clients must treat the token as opaque; any change to it is rejected.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use warrant_common::WarrantError;
use warrant_persistence::ConsumerCursor;

/// Cursor format version
const CURSOR_VERSION: u8 = 1;

/// HMAC key length in bytes
const HMAC_KEY_LENGTH: usize = 32;

/// HMAC output length (truncated)
const HMAC_LENGTH: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    #[serde(rename = "v")]
    version: u8,
    #[serde(rename = "id")]
    after_id: String,
    #[serde(rename = "ck")]
    after_checkin: Option<i64>,
}

/// Cursor encoder/decoder with HMAC validation
#[derive(Clone)]
pub struct CursorCodec {
    key: [u8; HMAC_KEY_LENGTH],
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

impl CursorCodec {
    /// Create a codec with the given key
    pub fn new(key: [u8; HMAC_KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Derive the key from a configured secret.
    ///
    /// Every process sharing the secret accepts the others' cursors.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; HMAC_KEY_LENGTH];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Create a codec with a random key. Cursors are then only valid within
    /// this process.
    pub fn with_random_key() -> Self {
        Self {
            key: rand::random(),
        }
    }

    fn mac(&self) -> Result<Hmac<Sha256>, WarrantError> {
        <Hmac<Sha256>>::new_from_slice(&self.key)
            .map_err(|e| WarrantError::InternalError(format!("cursor key rejected: {}", e)))
    }

    /// Encode a cursor to an opaque, URL-safe token
    pub fn encode(&self, cursor: &ConsumerCursor) -> Result<String, WarrantError> {
        let payload = CursorPayload {
            version: CURSOR_VERSION,
            after_id: cursor.after_id.clone(),
            after_checkin: cursor.after_checkin,
        };
        let mut bytes = serde_json::to_vec(&payload)
            .map_err(|e| WarrantError::InternalError(format!("cursor encoding failed: {}", e)))?;

        let mut mac = self.mac()?;
        mac.update(&bytes);
        let tag = mac.finalize().into_bytes();
        bytes.extend_from_slice(&tag[..HMAC_LENGTH]);

        Ok(URL_SAFE_NO_PAD.encode(&bytes))
    }

    /// Decode and validate a token.
    ///
    /// Fails with `InvalidCursor` when the token is malformed, was not produced
    /// with this key, or carries an unsupported version.
    pub fn decode(&self, token: &str) -> Result<ConsumerCursor, WarrantError> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| {
            WarrantError::InvalidCursor("cursor is not valid base64url".to_string())
        })?;
        if bytes.len() <= HMAC_LENGTH {
            return Err(WarrantError::InvalidCursor("cursor is truncated".to_string()));
        }

        let (payload, tag) = bytes.split_at(bytes.len() - HMAC_LENGTH);
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_truncated_left(tag)
            .map_err(|_| WarrantError::InvalidCursor("cursor signature mismatch".to_string()))?;

        let payload: CursorPayload = serde_json::from_slice(payload)
            .map_err(|_| WarrantError::InvalidCursor("cursor payload is malformed".to_string()))?;
        if payload.version != CURSOR_VERSION {
            return Err(WarrantError::InvalidCursor(format!(
                "unsupported cursor version {}",
                payload.version
            )));
        }

        Ok(ConsumerCursor::new(payload.after_id, payload.after_checkin))
    }

    /// Decode an optional token. `None` and blank tokens mean "first page".
    pub fn decode_optional(
        &self,
        token: Option<&str>,
    ) -> Result<Option<ConsumerCursor>, WarrantError> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => self.decode(t).map(Some),
            None => Ok(None),
        }
    }
}
