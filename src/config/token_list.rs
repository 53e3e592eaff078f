use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, error};

use crate::utils::constants::TOKEN_PREFIX_LEN;
use crate::vault::token::Token;

/// ================================
/// Managed tokens
/// ================================
#[derive(Debug, Clone, Deserialize)]
pub struct TokenList {
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub name: String,
    pub token: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenListFormat {
    Json,
    Yaml,
}

impl TokenListFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => TokenListFormat::Yaml,
            _ => TokenListFormat::Json,
        }
    }
}

/// Read, expand and validate the token list file.
pub async fn load_token_list(path: &Path) -> Result<TokenList> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read token list {}", path.display()))?;

    parse_token_list(&content, TokenListFormat::from_path(path))
        .with_context(|| format!("invalid token list {}", path.display()))
}

pub fn parse_token_list(content: &str, format: TokenListFormat) -> Result<TokenList> {
    let expanded = expand_env_vars(content)?;
    let token_list: TokenList = match format {
        TokenListFormat::Json => serde_json::from_str(&expanded)
            .inspect_err(|e| error!("parse token list error: {}", e))?,
        TokenListFormat::Yaml => serde_yaml::from_str(&expanded)
            .inspect_err(|e| error!("parse token list error: {}", e))?,
    };

    validate_token_list(&token_list)?;
    debug!("loaded {} tokens", token_list.tokens.len());
    Ok(token_list)
}

fn validate_token_list(token_list: &TokenList) -> Result<()> {
    for (position, entry) in token_list.tokens.iter().enumerate() {
        if entry.name.trim().is_empty() {
            bail!("token #{} has an empty name", position + 1);
        }
        if entry.token.len() < TOKEN_PREFIX_LEN {
            bail!(
                "token '{}' is shorter than {} characters",
                entry.name,
                TOKEN_PREFIX_LEN
            );
        }
    }
    Ok(())
}

/// Replace `${VAR}` and `${VAR:default}` with values from the environment.
fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}
