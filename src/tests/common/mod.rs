// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use reqwest::Client;
use serde_json::Value;

use crate::config::token_list::TokenEntry;
use crate::observability::metrics::RunMetrics;
use crate::vault::client::VaultClient;
use crate::vault::token::Token;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn vault_client(addr: SocketAddr) -> VaultClient {
    VaultClient::with_client(
        format!("http://{}", addr),
        Client::new(),
        true,
        RunMetrics::new().expect("metrics"),
    )
}

pub fn entry(name: &str, token: &str) -> TokenEntry {
    TokenEntry {
        name: name.to_owned(),
        token: Token::new(token),
    }
}

/// Server-side view of one token.
#[derive(Debug, Clone)]
pub struct FakeToken {
    pub ttl: u64,
    pub max_ttl: u64,
    pub renewable: bool,
    pub lookup_status: u16,
}

impl FakeToken {
    pub fn with_ttl(ttl: u64) -> Self {
        Self {
            ttl,
            max_ttl: u64::MAX,
            renewable: true,
            lookup_status: 200,
        }
    }

    pub fn capped_at(mut self, max_ttl: u64) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    pub fn not_renewable(mut self) -> Self {
        self.renewable = false;
        self
    }

    pub fn failing_lookup(mut self, status: u16) -> Self {
        self.lookup_status = status;
        self
    }
}

/// Stateful stand-in for the Vault token endpoints.
///
/// `renew-self` treats `increment` as the new total TTL, capped by the
/// token's max TTL, the way the real server does.
#[derive(Clone, Default)]
pub struct FakeVault {
    tokens: Arc<Mutex<HashMap<String, FakeToken>>>,
    calls: Arc<Mutex<Vec<(String, &'static str)>>>,
    renewals: Arc<Mutex<Vec<(String, u64)>>>,
}

impl FakeVault {
    pub fn with_token(self, token: &str, state: FakeToken) -> Self {
        self.tokens.lock().unwrap().insert(token.to_owned(), state);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/auth/token/lookup-self", get(lookup_self))
            .route("/v1/auth/token/renew-self", post(renew_self))
            .with_state(self.clone())
    }

    pub async fn spawn(&self) -> (JoinHandle<()>, SocketAddr) {
        spawn_axum(self.router()).await
    }

    /// (token, requested total TTL) of every renewal
    pub fn renewals(&self) -> Vec<(String, u64)> {
        self.renewals.lock().unwrap().clone()
    }

    /// Endpoints hit with `token`, in order.
    pub fn calls_of(&self, token: &str) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called_with, _)| called_with == token)
            .map(|(_, endpoint)| *endpoint)
            .collect()
    }

    pub fn ttl_of(&self, token: &str) -> Option<u64> {
        self.tokens.lock().unwrap().get(token).map(|state| state.ttl)
    }

    fn record(&self, token: &str, endpoint: &'static str) {
        self.calls.lock().unwrap().push((token.to_owned(), endpoint));
    }
}

fn vault_token(headers: &HeaderMap) -> String {
    headers
        .get("X-Vault-Token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn errors(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "errors": [message] })))
}

async fn lookup_self(State(vault): State<FakeVault>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let token = vault_token(&headers);
    vault.record(&token, "lookup");

    let found = vault.tokens.lock().unwrap().get(&token).cloned();
    match found {
        None => errors(StatusCode::FORBIDDEN, "permission denied"),
        Some(state) if state.lookup_status != 200 => errors(
            StatusCode::from_u16(state.lookup_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "lookup failed",
        ),
        Some(state) => (
            StatusCode::OK,
            Json(json!({
                "data": {
                    "accessor": format!("accessor-{}", &token[..8]),
                    "creation_time": 1_700_000_000,
                    "creation_ttl": 31_536_000,
                    "display_name": "token-fake",
                    "expire_time": "2030-01-01T00:00:00Z",
                    "id": token,
                    "issue_time": "2023-11-14T22:13:20Z",
                    "renewable": state.renewable,
                    "ttl": state.ttl
                }
            })),
        ),
    }
}

async fn renew_self(
    State(vault): State<FakeVault>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let token = vault_token(&headers);
    vault.record(&token, "renew");

    let Some(increment) = body.get("increment").and_then(Value::as_u64) else {
        return errors(StatusCode::BAD_REQUEST, "missing increment");
    };
    vault.renewals.lock().unwrap().push((token.clone(), increment));

    let mut tokens = vault.tokens.lock().unwrap();
    match tokens.get_mut(&token) {
        None => errors(StatusCode::FORBIDDEN, "permission denied"),
        Some(state) if !state.renewable => errors(StatusCode::BAD_REQUEST, "lease is not renewable"),
        Some(state) => {
            state.ttl = increment.min(state.max_ttl);
            (
                StatusCode::OK,
                Json(json!({
                    "auth": {
                        "client_token": token,
                        "lease_duration": state.ttl,
                        "renewable": true
                    }
                })),
            )
        }
    }
}
