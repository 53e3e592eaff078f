//! # Vault Token Renewer
//!
//! Single-pass job: looks up every configured Vault token, renews the ones
//! whose TTL dropped to the threshold, checks that the renewal took effect
//! and reports the statuses to Slack.
//!
//! Modules:
//! - `config` : settings from arguments / environment, token list file
//! - `vault` : token types and the Vault token API client
//! - `renewal` : check-or-renew decision, outcomes, batch runner
//! - `notify` : Slack webhook delivery
//! - `observability` : run metrics

pub mod app;
pub mod config;
pub mod helpers;
pub mod notify;
pub mod observability;
pub mod renewal;
pub mod utils;
pub mod vault;

#[cfg(test)]
mod tests;
