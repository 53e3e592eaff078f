use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{error, info, warn};

use crate::config::token_list::TokenEntry;
use crate::renewal::outcome::RenewalOutcome;
use crate::renewal::renewer::Renewer;
use crate::vault::client::TokenStateClient;

/// Check every token, at most `concurrency` at a time.
///
/// The calls of one token stay in order, a failing token never stops the
/// others. Outcomes come back in the order of `tokens`.
pub async fn run_batch<C>(
    renewer: Arc<Renewer<C>>,
    tokens: Vec<TokenEntry>,
    concurrency: usize,
) -> Vec<RenewalOutcome>
where
    C: TokenStateClient + 'static,
{
    info!(
        "processing {} tokens, concurrency {}",
        tokens.len(),
        concurrency
    );

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();
    let mut indexes: HashMap<Id, usize> = HashMap::with_capacity(tokens.len());

    for (index, entry) in tokens.iter().cloned().enumerate() {
        let renewer = renewer.clone();
        let semaphore = semaphore.clone();
        let handle = workers.spawn(async move {
            // never closed, a permit is always granted eventually
            let _permit = semaphore.acquire_owned().await;
            let result = renewer.evaluate(&entry.token).await;
            RenewalOutcome::from_result(&entry, result)
        });
        indexes.insert(handle.id(), index);
    }

    let mut outcomes: Vec<Option<RenewalOutcome>> = vec![None; tokens.len()];
    while let Some(joined) = workers.join_next_with_id().await {
        match joined {
            Ok((id, outcome)) => {
                if outcome.success {
                    info!("token {}...: {}", outcome.token_prefix, outcome.message);
                } else {
                    warn!("token {}...: {}", outcome.token_prefix, outcome.message);
                }
                if let Some(index) = indexes.remove(&id) {
                    outcomes[index] = Some(outcome);
                }
            }
            Err(err) => {
                if let Some(index) = indexes.remove(&err.id()) {
                    let entry = &tokens[index];
                    error!("worker for token {} did not finish: {}", entry.token, err);
                    outcomes[index] = Some(RenewalOutcome::aborted(
                        entry,
                        &format!("worker did not finish: {}", err),
                    ));
                }
            }
        }
    }

    outcomes.into_iter().flatten().collect()
}
