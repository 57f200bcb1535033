//! Exchange credentials, read from the process environment only.

use std::fmt;

use super::ConfigError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "EXCHANGE_API_KEY";

/// Environment variable holding the API secret.
pub const API_SECRET_ENV: &str = "EXCHANGE_API_SECRET";

/// API key and secret for signed exchange requests.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeCredentials {
    api_key: String,
    api_secret: String,
}

impl ExchangeCredentials {
    /// Create credentials from explicit values.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read `EXCHANGE_API_KEY` and `EXCHANGE_API_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns `MissingEnvVar` naming every unset or empty variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup` (environment access is injectable for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_ENV).filter(|v| !v.is_empty());
        let api_secret = lookup(API_SECRET_ENV).filter(|v| !v.is_empty());

        match (api_key, api_secret) {
            (Some(api_key), Some(api_secret)) => Ok(Self { api_key, api_secret }),
            (api_key, api_secret) => {
                let missing: Vec<&str> = [
                    api_key.is_none().then_some(API_KEY_ENV),
                    api_secret.is_none().then_some(API_SECRET_ENV),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(ConfigError::MissingEnvVar(missing.join(", ")))
            }
        }
    }

    /// Split into `(api_key, api_secret)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.api_key, self.api_secret)
    }
}

impl fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn reads_both_variables() {
        let creds = ExchangeCredentials::from_lookup(lookup(&[
            (API_KEY_ENV, "key"),
            (API_SECRET_ENV, "secret"),
        ]))
        .unwrap();
        assert_eq!(creds.into_parts(), ("key".to_string(), "secret".to_string()));
    }

    #[test]
    fn reports_every_missing_variable() {
        let Err(err) = ExchangeCredentials::from_lookup(lookup(&[(API_KEY_ENV, "")])) else {
            panic!("expected missing credentials");
        };
        let msg = err.to_string();
        assert!(msg.contains(API_KEY_ENV));
        assert!(msg.contains(API_SECRET_ENV));
    }

    #[test]
    fn reports_only_missing_secret() {
        let Err(err) = ExchangeCredentials::from_lookup(lookup(&[(API_KEY_ENV, "key")])) else {
            panic!("expected missing secret");
        };
        let msg = err.to_string();
        assert!(!msg.contains(API_KEY_ENV));
        assert!(msg.contains(API_SECRET_ENV));
    }

    #[test]
    fn debug_redacts_values() {
        let debug = format!("{:?}", ExchangeCredentials::new("k-123", "s-456"));
        assert!(!debug.contains("k-123"));
        assert!(!debug.contains("s-456"));
    }
}
