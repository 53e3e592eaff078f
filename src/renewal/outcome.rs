use crate::config::token_list::TokenEntry;
use crate::helpers::time::seconds_to_days;
use crate::renewal::renewer::{CheckedToken, RenewalAction, RenewalError};
use crate::vault::error::FailureKind;

/// Result of processing one token in one run, handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalOutcome {
    pub name: String,
    pub token_prefix: String,
    pub success: bool,
    pub action: Option<RenewalAction>,
    pub message: String,
    pub ttl: Option<u64>,
    pub failure: Option<FailureKind>,
    pub renewal_attempted: bool,
}

impl RenewalOutcome {
    pub fn from_result(entry: &TokenEntry, result: Result<CheckedToken, RenewalError>) -> Self {
        match result {
            Ok(checked) => Self::succeeded(entry, checked),
            Err(err) => Self::failed(entry, &err),
        }
    }

    pub fn succeeded(entry: &TokenEntry, checked: CheckedToken) -> Self {
        let ttl = checked.state.ttl;
        Self {
            name: entry.name.clone(),
            token_prefix: entry.token.prefix().to_owned(),
            success: true,
            action: Some(checked.action),
            message: format!(
                "new/current TTL is {} ({} days); display name: {}",
                ttl,
                seconds_to_days(ttl),
                entry.name
            ),
            ttl: Some(ttl),
            failure: None,
            renewal_attempted: checked.action == RenewalAction::Renewed,
        }
    }

    pub fn failed(entry: &TokenEntry, err: &RenewalError) -> Self {
        Self {
            failure: Some(err.kind()),
            renewal_attempted: err.renewal_attempted(),
            ..Self::failure_message(entry, &err.to_string())
        }
    }

    /// Token whose worker did not finish, e.g. because it panicked.
    pub fn aborted(entry: &TokenEntry, reason: &str) -> Self {
        Self::failure_message(entry, reason)
    }

    fn failure_message(entry: &TokenEntry, cause: &str) -> Self {
        Self {
            name: entry.name.clone(),
            token_prefix: entry.token.prefix().to_owned(),
            success: false,
            action: None,
            message: format!(
                "Could not renew; display name: {}; error: {}",
                entry.name,
                entry.token.redact(cause)
            ),
            ttl: None,
            failure: None,
            renewal_attempted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::error::ClientError;
    use crate::vault::token::{Token, TokenState};

    fn entry() -> TokenEntry {
        TokenEntry {
            name: "gitlab-runner".to_owned(),
            token: Token::new("s.Ab12Cd34Ef56Gh78"),
        }
    }

    fn checked(ttl: u64, action: RenewalAction) -> CheckedToken {
        CheckedToken {
            state: TokenState {
                accessor: String::new(),
                creation_time: 0,
                creation_ttl: 0,
                display_name: "token".to_owned(),
                expire_time: None,
                issue_time: None,
                renewable: true,
                ttl,
            },
            action,
        }
    }

    #[test]
    fn success_reports_ttl_in_days() {
        let outcome = RenewalOutcome::from_result(&entry(), Ok(checked(6_184_000, RenewalAction::Renewed)));

        assert!(outcome.success);
        assert_eq!(outcome.token_prefix, "s.Ab12Cd");
        assert_eq!(
            outcome.message,
            "new/current TTL is 6184000 (71 days); display name: gitlab-runner"
        );
        assert_eq!(outcome.ttl, Some(6_184_000));
        assert!(outcome.renewal_attempted);
    }

    #[test]
    fn unchanged_token_is_not_counted_as_renewal() {
        let outcome = RenewalOutcome::from_result(&entry(), Ok(checked(20_000_000, RenewalAction::Unchanged)));

        assert!(outcome.success);
        assert_eq!(outcome.action, Some(RenewalAction::Unchanged));
        assert!(!outcome.renewal_attempted);
    }

    #[test]
    fn failure_keeps_cause_and_kind() {
        let err = RenewalError::Lookup {
            prefix: "s.Ab12Cd".to_owned(),
            source: ClientError::UnexpectedStatus {
                status: 403,
                body: String::new(),
            },
        };

        let outcome = RenewalOutcome::from_result(&entry(), Err(err));

        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::UnexpectedStatus));
        assert_eq!(
            outcome.message,
            "Could not renew; display name: gitlab-runner; error: could not get details for token s.Ab12Cd...: unexpected response code: 403"
        );
        assert_eq!(outcome.ttl, None);
    }

    #[test]
    fn aborted_message_is_redacted() {
        let outcome = RenewalOutcome::aborted(&entry(), "worker for s.Ab12Cd34Ef56Gh78 panicked");

        assert!(!outcome.success);
        assert!(!outcome.message.contains("s.Ab12Cd34Ef56Gh78"));
    }
}
