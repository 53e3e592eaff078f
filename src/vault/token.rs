use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::constants::TOKEN_PREFIX_LEN;

/// Secret Vault token.
///
/// `Debug` and `Display` only ever render the first [`TOKEN_PREFIX_LEN`]
/// characters, use [`Token::expose`] to get the full value for requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First characters of the token, safe for logs and messages.
    pub fn prefix(&self) -> &str {
        match self.0.char_indices().nth(TOKEN_PREFIX_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Replace every occurrence of the full token in `text` with its prefix.
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_owned();
        }
        text.replace(&self.0, &format!("{}...", self.prefix()))
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}...)", self.prefix())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", self.prefix())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Token)
    }
}

/// Snapshot of a token as reported by `lookup-self`.
///
/// Never mutated, a newer snapshot comes from a fresh lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenState {
    #[serde(default)]
    pub accessor: String,
    /// unix seconds
    #[serde(default)]
    pub creation_time: i64,
    #[serde(default)]
    pub creation_ttl: u64,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issue_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub renewable: bool,
    /// seconds until expiry
    pub ttl: u64,
}

/// `lookup-self` envelope
#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    pub data: TokenState,
}

/// `renew-self` body. Vault reads `increment` as the new total TTL.
#[derive(Debug, Serialize)]
pub struct RenewRequest {
    pub increment: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formatting_never_shows_full_token() {
        let token = Token::new("s.abcdefgh12345678");

        assert_eq!(token.prefix(), "s.abcdef");
        assert_eq!(token.to_string(), "s.abcdef...");
        assert_eq!(format!("{:?}", token), "Token(s.abcdef...)");
        assert!(!format!("{:?}", vec![token.clone()]).contains("12345678"));
    }

    #[test]
    fn prefix_of_short_or_multibyte_token() {
        assert_eq!(Token::new("abc").prefix(), "abc");
        assert_eq!(Token::new("ééééééééé").prefix(), "éééééééé");
    }

    #[test]
    fn redact_replaces_every_occurrence() {
        let token = Token::new("s.abcdefgh12345678");
        let body = r#"{"data":{"id":"s.abcdefgh12345678","other":"s.abcdefgh12345678"}}"#;

        let redacted = token.redact(body);
        assert!(!redacted.contains("12345678"));
        assert_eq!(redacted.matches("s.abcdef...").count(), 2);
    }

    #[test]
    fn lookup_response_parses_vault_payload() {
        let body = json!({
            "request_id": "8c9f1d14-6a4a-4bc3-97a7-2ba3b7e2c6a8",
            "data": {
                "accessor": "8609694a-cdbc-db9b-d345-e782dbb562ed",
                "creation_time": 1523979354,
                "creation_ttl": 2764800,
                "display_name": "ldap2-tesla",
                "entity_id": "7d2e3179-f69b-450c-7179-ac8ee8bd8ca9",
                "expire_time": "2018-05-19T11:35:54.466476215-04:00",
                "explicit_max_ttl": 0,
                "id": "cf64a70f-3a12-3f6c-791d-6cef6d390eed",
                "issue_time": "2018-04-17T11:35:54.466476078-04:00",
                "renewable": true,
                "ttl": 2764790,
                "type": "service"
            }
        });

        let parsed: LookupResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.data.ttl, 2_764_790);
        assert_eq!(parsed.data.display_name, "ldap2-tesla");
        assert!(parsed.data.renewable);
        assert_eq!(
            parsed.data.expire_time.map(|t| t.timestamp()),
            Some(1_526_744_154)
        );
    }

    #[test]
    fn root_token_without_expiry_parses() {
        let body = json!({"data": {"accessor": "a", "expire_time": null, "ttl": 0}});
        let parsed: LookupResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.data.expire_time, None);
        assert_eq!(parsed.data.ttl, 0);
    }

    #[test]
    fn negative_or_missing_ttl_is_rejected() {
        assert!(serde_json::from_value::<LookupResponse>(json!({"data": {"ttl": -1}})).is_err());
        assert!(serde_json::from_value::<LookupResponse>(json!({"data": {}})).is_err());
    }
}
