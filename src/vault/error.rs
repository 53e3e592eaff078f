//! Failures of single token operations against Vault.

use std::fmt;

use thiserror::Error;

/// Error raised by a [`TokenStateClient`](crate::vault::client::TokenStateClient) call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Vault could not be reached or the body could not be read.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Vault answered with anything but 200.
    #[error("unexpected response code: {status}")]
    UnexpectedStatus { status: u16, body: String },
    /// The body does not match the expected schema.
    #[error("could not decode Vault response: {0}")]
    Decode(#[source] serde_json::Error),
    /// Renewal was accepted but the follow-up lookup failed.
    #[error("could not get token details after renewal: {0}")]
    RenewalVerificationFailed(#[source] Box<ClientError>),
}

/// Coarse failure category, used for outcomes and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    TransportError,
    UnexpectedStatus,
    DecodeError,
    RenewalVerificationFailed,
    RenewalIneffective,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Transport(_) => FailureKind::TransportError,
            ClientError::UnexpectedStatus { .. } => FailureKind::UnexpectedStatus,
            ClientError::Decode(_) => FailureKind::DecodeError,
            ClientError::RenewalVerificationFailed(_) => FailureKind::RenewalVerificationFailed,
        }
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransportError => "transport_error",
            FailureKind::UnexpectedStatus => "unexpected_status",
            FailureKind::DecodeError => "decode_error",
            FailureKind::RenewalVerificationFailed => "renewal_verification_failed",
            FailureKind::RenewalIneffective => "renewal_ineffective",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
