use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tokio::fs;
use tracing::debug;

use crate::renewal::outcome::RenewalOutcome;

static SUCCESS_MSG: &str = "success";
static FAILURE_MSG: &str = "failure";
static UNKNOWN_MSG: &str = "unknown";

/// Metrics of a single run.
///
/// A fresh registry per run, there is no scrape endpoint: the job writes
/// the registry to a textfile for the node exporter when asked to.
pub struct RunMetrics {
    pub registry: Registry,

    // Token metrics
    pub tokens_processed: IntCounterVec,
    pub renewals_attempted: IntCounter,
    pub failures: IntCounterVec,
    pub token_ttl: IntGaugeVec,

    // Vault metrics
    pub vault_request_duration: HistogramVec,

    // Run
    pub last_run_timestamp: IntGauge,
}

impl RunMetrics {
    pub fn new() -> Result<Arc<Self>> {
        let registry = Registry::new_custom(Some("tokenrenewer".into()), None)?;

        let metrics = Arc::new(Self {
            tokens_processed: IntCounterVec::new(Opts::new("tokens_processed_total", "Tokens processed by result"), &["result"])?,
            renewals_attempted: IntCounter::new("renewals_attempted_total", "Renewal requests sent to Vault")?,
            failures: IntCounterVec::new(Opts::new("failures_total", "Token failures by kind"), &["kind"])?,
            token_ttl: IntGaugeVec::new(Opts::new("token_ttl_seconds", "TTL of the token after the run"), &["token_prefix", "name"])?,

            vault_request_duration: HistogramVec::new(
                HistogramOpts::new("vault_request_duration_seconds", "Vault request duration seconds")
                    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
                &["operation"],
            )?,

            last_run_timestamp: IntGauge::new("last_run_timestamp_seconds", "Unix time of the last finished run")?,

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.tokens_processed.clone()))?;
        reg.register(Box::new(metrics.renewals_attempted.clone()))?;
        reg.register(Box::new(metrics.failures.clone()))?;
        reg.register(Box::new(metrics.token_ttl.clone()))?;
        reg.register(Box::new(metrics.vault_request_duration.clone()))?;
        reg.register(Box::new(metrics.last_run_timestamp.clone()))?;

        Ok(metrics)
    }

    pub fn observe_vault_request(&self, operation: &str, elapsed: Duration) {
        self.vault_request_duration
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_outcome(&self, outcome: &RenewalOutcome) {
        let result = if outcome.success { SUCCESS_MSG } else { FAILURE_MSG };
        self.tokens_processed.with_label_values(&[result]).inc();

        if outcome.renewal_attempted {
            self.renewals_attempted.inc();
        }
        if !outcome.success {
            let kind = outcome.failure.map(|kind| kind.as_str()).unwrap_or(UNKNOWN_MSG);
            self.failures.with_label_values(&[kind]).inc();
        }
        if let Some(ttl) = outcome.ttl {
            self.token_ttl
                .with_label_values(&[outcome.token_prefix.as_str(), outcome.name.as_str()])
                .set(i64::try_from(ttl).unwrap_or(i64::MAX));
        }
    }

    /// Registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).context("metrics are not valid utf-8")
    }

    /// Write the registry to `path` through a temporary file and a rename,
    /// so a collector never reads a half-written file.
    pub async fn write_textfile(&self, path: &Path) -> Result<()> {
        let content = self.encode()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("could not write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("could not move metrics into {}", path.display()))?;
        debug!("metrics written to {}", path.display());
        Ok(())
    }
}
