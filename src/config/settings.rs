use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use reqwest::Url;

use crate::renewal::renewer::RenewalPolicy;
use crate::utils::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_TTL_INCREMENT_SECS, DEFAULT_TTL_THRESHOLD_SECS, MAX_TTL_SECS,
};
use crate::utils::logging::LogLevel;

/// ================================
/// Command line / environment
/// ================================
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Vault address, only scheme, host and port are used
    #[arg(long, env = "VAULT_ADDRESS")]
    pub vault_address: String,
    /// JSON (or YAML) file with the tokens to manage
    #[arg(long, env = "CONFIG_FILE_PATH")]
    pub config_file_path: PathBuf,
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook_url: String,
    /// Skip TLS certificate verification
    #[arg(long, env = "INSECURE", value_parser = BoolishValueParser::new())]
    pub insecure: bool,
    #[arg(long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,
    /// Tokens with TTL at or below this value (seconds) are renewed
    #[arg(long, env = "TTL_THRESHOLD", default_value_t = DEFAULT_TTL_THRESHOLD_SECS)]
    pub ttl_threshold: u64,
    /// Seconds added to the current TTL on renewal
    #[arg(long, env = "TTL_INCREMENT", default_value_t = DEFAULT_TTL_INCREMENT_SECS)]
    pub ttl_increment: u64,
    /// Number of tokens processed at the same time
    #[arg(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    /// Write run metrics in Prometheus text format to this file
    #[arg(long, env = "METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,
    #[arg(long, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Args {
    /// Validate the raw arguments and build the run-wide settings.
    pub fn into_settings(self) -> Result<Settings> {
        let vault_address = normalize_vault_address(&self.vault_address)?;

        let slack_webhook_url = Url::parse(&self.slack_webhook_url)
            .context("could not parse Slack webhook URL")?;

        if self.ttl_increment == 0 {
            bail!("TTL increment must be greater than zero");
        }
        if self.ttl_increment > MAX_TTL_SECS {
            bail!("TTL increment must not exceed {} seconds", MAX_TTL_SECS);
        }
        if self.ttl_threshold > MAX_TTL_SECS {
            bail!("TTL threshold must not exceed {} seconds", MAX_TTL_SECS);
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let level = self
            .log_level
            .map(|level| level.as_str().to_owned())
            .unwrap_or_else(|| if self.debug { "debug" } else { "info" }.to_owned());

        Ok(Settings {
            vault_address,
            config_file_path: self.config_file_path,
            slack_webhook_url,
            insecure: self.insecure,
            debug: self.debug,
            policy: RenewalPolicy::new(self.ttl_threshold, self.ttl_increment),
            concurrency: self.concurrency,
            metrics_file: self.metrics_file,
            logging: LoggingConfig::new(level, self.log_format),
        })
    }
}

/// Keeps `scheme://host[:port]` and drops any path or query.
fn normalize_vault_address(raw: &str) -> Result<String> {
    let url = Url::parse(raw).context("could not parse Vault address")?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported Vault address scheme '{}'", other),
    }
    if url.host_str().is_none() {
        return Err(anyhow!("Vault address '{}' has no host", raw));
    }
    Ok(url.origin().ascii_serialization())
}

/// ================================
/// Global run-wide settings
/// ================================
#[derive(Debug, Clone)]
pub struct Settings {
    pub vault_address: String,
    pub config_file_path: PathBuf,
    pub slack_webhook_url: Url,
    pub insecure: bool,
    pub debug: bool,
    pub policy: RenewalPolicy,
    pub concurrency: usize,
    pub metrics_file: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the webhook path is a credential
        let webhook_host = self.slack_webhook_url.host_str().unwrap_or("-");
        write!(
            f,
            "vault_address={} config_file_path={} slack_webhook={}://{}/... insecure={} debug={} \
             ttl_threshold={} ttl_increment={} concurrency={} metrics_file={} log_level={} log_format={:?}",
            self.vault_address,
            self.config_file_path.display(),
            self.slack_webhook_url.scheme(),
            webhook_host,
            self.insecure,
            self.debug,
            self.policy.threshold,
            self.policy.increment,
            self.concurrency,
            self.metrics_file
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "-".to_owned()),
            self.logging.level,
            self.logging.format,
        )
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Compact,
}
