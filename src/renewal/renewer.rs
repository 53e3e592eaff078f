use thiserror::Error;
use tracing::{debug, info};

use crate::helpers::time::seconds_to_days;
use crate::utils::constants::MAX_TTL_SECS;
use crate::vault::client::TokenStateClient;
use crate::vault::error::{ClientError, FailureKind};
use crate::vault::token::{Token, TokenState};

/// When to renew and by how much, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    pub threshold: u64,
    pub increment: u64,
}

impl RenewalPolicy {
    pub fn new(threshold: u64, increment: u64) -> Self {
        Self {
            threshold,
            increment,
        }
    }

    /// Inclusive: a TTL equal to the threshold is renewed.
    pub fn needs_renewal(&self, ttl: u64) -> bool {
        ttl <= self.threshold
    }

    /// Value sent as `increment` to `renew-self`.
    ///
    /// Vault (tested with v0.11.4) applies `increment` as the new total TTL
    /// instead of adding it to the current one, so the current TTL is added
    /// here. This contradicts the documented semantics of the parameter and
    /// has to be re-checked whenever the Vault version changes: sending the
    /// bare increment would silently shorten the token.
    ///
    /// Capped at `MAX_TTL_SECS`, the largest TTL Vault can parse.
    pub fn renewal_target(&self, ttl: u64) -> u64 {
        ttl.saturating_add(self.increment).min(MAX_TTL_SECS)
    }
}

#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("could not get details for token {prefix}...: {source}")]
    Lookup {
        prefix: String,
        #[source]
        source: ClientError,
    },
    #[error("could not renew token {prefix}...: {source}")]
    Renew {
        prefix: String,
        #[source]
        source: ClientError,
    },
    /// Vault accepted the renewal but the TTL did not grow, usually
    /// because the token hit its max TTL.
    #[error("TTL for token {prefix}... was not increased (old TTL {old_ttl}, new TTL {new_ttl})")]
    Ineffective {
        prefix: String,
        old_ttl: u64,
        new_ttl: u64,
    },
}

impl RenewalError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RenewalError::Lookup { source, .. } | RenewalError::Renew { source, .. } => {
                source.kind()
            }
            RenewalError::Ineffective { .. } => FailureKind::RenewalIneffective,
        }
    }

    pub fn renewal_attempted(&self) -> bool {
        !matches!(self, RenewalError::Lookup { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalAction {
    Renewed,
    Unchanged,
}

/// Successful check of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedToken {
    pub state: TokenState,
    pub action: RenewalAction,
}

/// Check-then-renew decision for single tokens.
pub struct Renewer<C> {
    client: C,
    policy: RenewalPolicy,
}

impl<C: TokenStateClient> Renewer<C> {
    pub fn new(client: C, policy: RenewalPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// State of `token` after renewing it if its TTL is at or below the threshold.
    pub async fn check_or_renew(&self, token: &Token) -> Result<TokenState, RenewalError> {
        self.evaluate(token).await.map(|checked| checked.state)
    }

    /// Same as [`Renewer::check_or_renew`], also telling whether a renewal happened.
    pub async fn evaluate(&self, token: &Token) -> Result<CheckedToken, RenewalError> {
        let current = self
            .client
            .lookup_self(token)
            .await
            .map_err(|source| RenewalError::Lookup {
                prefix: token.prefix().to_owned(),
                source,
            })?;

        if !self.policy.needs_renewal(current.ttl) {
            debug!(
                "renewal not needed for token {} ({} days above the threshold)",
                token,
                seconds_to_days(current.ttl - self.policy.threshold)
            );
            return Ok(CheckedToken {
                state: current,
                action: RenewalAction::Unchanged,
            });
        }

        debug!(
            "current TTL of token '{}' is {} days ...",
            token,
            seconds_to_days(current.ttl)
        );

        let target = self.policy.renewal_target(current.ttl);
        let renewed = self
            .client
            .renew(token, target)
            .await
            .map_err(|source| RenewalError::Renew {
                prefix: token.prefix().to_owned(),
                source,
            })?;

        if renewed.ttl <= current.ttl {
            return Err(RenewalError::Ineffective {
                prefix: token.prefix().to_owned(),
                old_ttl: current.ttl,
                new_ttl: renewed.ttl,
            });
        }

        info!(
            "renewed token {}; new TTL: {}; old TTL: {}",
            token, renewed.ttl, current.ttl
        );
        Ok(CheckedToken {
            state: renewed,
            action: RenewalAction::Renewed,
        })
    }
}
