//! Request signing for the Binance signed endpoints.
//!
//! The canonical query string is the request parameters sorted by key with
//! URL-encoded values. The signature is the hex HMAC-SHA256 of that string
//! under the API secret, appended last as `signature`.

use std::collections::BTreeMap;
use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Request parameters kept in canonical (sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedParams {
    params: BTreeMap<&'static str, String>,
}

impl SignedParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.insert(key, value.to_string());
        self
    }

    /// Add a parameter when `value` is present.
    #[must_use]
    pub fn with_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Value of `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Canonical query string: `k1=v1&k2=v2` sorted by key.
    #[must_use]
    pub fn canonical_query(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// HMAC-SHA256 signer holding the API secret.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl RequestSigner {
    /// Create a signer for `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex-encoded HMAC-SHA256 of `payload`.
    #[must_use]
    pub fn sign(&self, payload: &str) -> String {
        // HMAC accepts keys of any length.
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return String::new();
        };
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Canonical query string with `signature` appended last.
    #[must_use]
    pub fn signed_query(&self, params: &SignedParams) -> String {
        let query = params.canonical_query();
        let signature = self.sign(&query);
        if query.is_empty() {
            format!("signature={signature}")
        } else {
            format!("{query}&signature={signature}")
        }
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}
