use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::config::token_list::load_token_list;
use crate::helpers::time::now_i64;
use crate::notify::slack::{SlackNotifier, StatusRegistry};
use crate::observability::metrics::RunMetrics;
use crate::renewal::batch::run_batch;
use crate::renewal::outcome::RenewalOutcome;
use crate::renewal::renewer::{RenewalAction, Renewer};
use crate::vault::client::VaultClient;

/// Counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub renewed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[RenewalOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            summary.total += 1;
            if outcome.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if outcome.action == Some(RenewalAction::Renewed) {
                summary.renewed += 1;
            }
            summary
        })
    }
}

/// One pass over the token list.
///
/// Setup failures (client, token list, notification) are returned,
/// per-token failures only show up in the summary and the notification.
pub async fn run(settings: &Settings) -> Result<RunSummary> {
    info!("token renewal started ...");
    if settings.debug {
        debug!("configuration: {}", settings);
    }

    let metrics = RunMetrics::new().context("could not create metrics registry")?;
    let client = VaultClient::new(settings, metrics.clone())
        .context("could not initialize Vault client")?;
    let notifier = SlackNotifier::new(settings.slack_webhook_url.clone())
        .context("could not initialize Slack notifier")?;

    let token_list = load_token_list(&settings.config_file_path).await?;

    let renewer = Arc::new(Renewer::new(client, settings.policy));
    let outcomes = run_batch(renewer, token_list.tokens, settings.concurrency).await;

    let mut registry = StatusRegistry::new();
    for outcome in &outcomes {
        metrics.record_outcome(outcome);
        registry.add_outcome(outcome);
    }
    let summary = RunSummary::from_outcomes(&outcomes);
    metrics.last_run_timestamp.set(now_i64());

    if let Some(path) = &settings.metrics_file {
        if let Err(err) = metrics.write_textfile(path).await {
            warn!("could not write metrics file: {:#}", err);
        }
    }

    notifier
        .notify(&registry)
        .await
        .context("could not send Slack message")?;

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        renewed = summary.renewed,
        "done."
    );
    Ok(summary)
}
