//! Authenticated user attributes bound to a session.
//!
//! The login flow stores these in the `auth` cookie as base64-encoded
//! JSON. The room only needs them to be present; it does not check them.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Name of the cookie carrying the encoded [`Identity`].
pub const AUTH_COOKIE: &str = "auth";

/// Identity of the user behind a session, as issued by the login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique user id (hash of the provider e-mail).
    #[serde(rename = "userid")]
    pub user_id: String,
    /// Display name shown as the author of messages.
    pub name: String,
    /// Avatar URL supplied by the auth provider, if any.
    #[serde(default)]
    pub avatar_url: String,
}

impl Identity {
    /// Decodes an identity from an `auth` cookie value.
    ///
    /// Accepts standard and URL-safe base64 alphabets.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Unauthorized`] when the value is empty, is not
    /// base64, is not the expected JSON object, or carries no name.
    pub fn from_cookie_value(value: &str) -> Result<Self, ChatError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ChatError::Unauthorized("empty auth cookie".to_string()));
        }
        let bytes = STANDARD
            .decode(value)
            .or_else(|_| URL_SAFE.decode(value))
            .map_err(|e| ChatError::Unauthorized(format!("auth cookie is not base64: {e}")))?;
        let identity: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ChatError::Unauthorized(format!("malformed auth cookie: {e}")))?;
        if identity.name.is_empty() {
            return Err(ChatError::Unauthorized("auth cookie has no name".to_string()));
        }
        Ok(identity)
    }

    /// Finds the `auth` cookie in a raw `Cookie` header and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Unauthorized`] when the cookie is absent or
    /// cannot be decoded.
    pub fn from_cookie_header(header: &str) -> Result<Self, ChatError> {
        let value = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == AUTH_COOKIE)
            .map(|(_, value)| value)
            .ok_or_else(|| ChatError::Unauthorized("missing auth cookie".to_string()))?;
        Self::from_cookie_value(value)
    }

    /// Encodes this identity the way the login flow stores it.
    #[must_use]
    pub fn to_cookie_value(&self) -> String {
        STANDARD.encode(serde_json::to_vec(self).unwrap_or_default())
    }
}
