use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::config::settings::Settings;
use crate::helpers::time::get_instant;
use crate::observability::metrics::RunMetrics;
use crate::utils::constants::{LOOKUP_SELF_PATH, RENEW_SELF_PATH, VAULT_TOKEN_HEADER};
use crate::vault::error::ClientError;
use crate::vault::token::{LookupResponse, RenewRequest, Token, TokenState};

static LOOKUP_MSG: &str = "lookup_self";
static RENEW_MSG: &str = "renew_self";

/// Token operations done on behalf of the token itself, so no
/// privileged token is needed.
pub trait TokenStateClient: Send + Sync {
    /// Current state of `token`.
    fn lookup_self(
        &self,
        token: &Token,
    ) -> impl std::future::Future<Output = Result<TokenState, ClientError>> + Send;

    /// Ask Vault for `new_total_ttl` and return the state read back by a
    /// fresh lookup. The renewal response itself is not trusted.
    fn renew(
        &self,
        token: &Token,
        new_total_ttl: u64,
    ) -> impl std::future::Future<Output = Result<TokenState, ClientError>> + Send;
}

#[derive(Clone)]
pub struct VaultClient {
    address: String,
    client: Client,
    debug: bool,
    metrics: Arc<RunMetrics>,
}

impl VaultClient {
    pub fn new(settings: &Settings, metrics: Arc<RunMetrics>) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(settings.insecure)
            .build()
            .context("could not build HTTP client")?;

        Ok(Self::with_client(
            settings.vault_address.clone(),
            client,
            settings.debug,
            metrics,
        ))
    }

    pub fn with_client(
        address: String,
        client: Client,
        debug: bool,
        metrics: Arc<RunMetrics>,
    ) -> Self {
        Self {
            address: address.trim_end_matches('/').to_owned(),
            client,
            debug,
            metrics,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Status and body of a finished request, timing it under `operation`.
    async fn read_response(
        &self,
        operation: &str,
        token: &Token,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), ClientError> {
        let start = get_instant();
        let result = match request.send().await {
            Ok(response) => read_body(response).await,
            Err(err) => Err(err),
        };
        self.metrics.observe_vault_request(operation, start.elapsed());

        let (status, body) = result.map_err(ClientError::Transport)?;
        if self.debug {
            // lookup-self echoes the token as `id`
            debug!("code: {}; body: {}", status.as_u16(), token.redact(&body));
        }

        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                body: token.redact(&body),
            });
        }
        Ok((status, body))
    }
}

async fn read_body(response: Response) -> Result<(StatusCode, String), reqwest::Error> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

impl TokenStateClient for VaultClient {
    async fn lookup_self(&self, token: &Token) -> Result<TokenState, ClientError> {
        if self.debug {
            debug!("obtaining details for token '{}'", token);
        }

        let request = self
            .client
            .get(self.url(LOOKUP_SELF_PATH))
            .header(VAULT_TOKEN_HEADER, token.expose());
        let (_, body) = self.read_response(LOOKUP_MSG, token, request).await?;

        serde_json::from_str::<LookupResponse>(&body)
            .map(|response| response.data)
            .map_err(ClientError::Decode)
    }

    async fn renew(&self, token: &Token, new_total_ttl: u64) -> Result<TokenState, ClientError> {
        if self.debug {
            debug!(
                "sending renewal request for token '{}' with TTL {} ...",
                token, new_total_ttl
            );
        }

        let request = self
            .client
            .post(self.url(RENEW_SELF_PATH))
            .header(VAULT_TOKEN_HEADER, token.expose())
            .json(&RenewRequest {
                increment: new_total_ttl,
            });
        self.read_response(RENEW_MSG, token, request).await?;

        self.lookup_self(token)
            .await
            .map_err(|err| ClientError::RenewalVerificationFailed(Box::new(err)))
    }
}
