//! Shared constants and invariants

/// ~6 months
pub const DEFAULT_TTL_THRESHOLD_SECS: u64 = 15_206_400;
/// 60 days
pub const DEFAULT_TTL_INCREMENT_SECS: u64 = 5_184_000;
pub const DEFAULT_CONCURRENCY: usize = 1;
/// Vault reads TTLs as signed 64-bit seconds.
pub const MAX_TTL_SECS: u64 = i64::MAX as u64;

/// Number of leading token characters allowed in logs and messages.
pub const TOKEN_PREFIX_LEN: usize = 8;

pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";
pub const LOOKUP_SELF_PATH: &str = "/v1/auth/token/lookup-self";
pub const RENEW_SELF_PATH: &str = "/v1/auth/token/renew-self";

pub const SLACK_MESSAGE_TITLE: &str = "Vault token renewal status";
pub const SLACK_COLOR_SUCCESS: &str = "#008000";
pub const SLACK_COLOR_FAILURE: &str = "#FF0000";
