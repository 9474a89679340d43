//! HTTP client for the agent admin API

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// HTTP client for an agent's admin API.
///
/// When a sub-wallet is active its bearer token is attached to every
/// request, so calls act on that wallet.
#[derive(Debug)]
pub struct AdminClient {
    base_url: String,
    http: Client,
    wallet_token: RwLock<Option<String>>,
}

impl AdminClient {
    /// Create a new client pointing to the given base URL.
    ///
    /// Example: `AdminClient::new("http://localhost:8031")`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
            wallet_token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Act on behalf of a sub-wallet from now on
    pub fn set_wallet_token(&self, token: Option<String>) {
        *self.wallet_token.write() = token;
    }

    pub fn has_wallet_token(&self) -> bool {
        self.wallet_token.read().is_some()
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.authorize(self.http.get(&url)).send().await?;
        self.json_response(path, response).await
    }

    pub async fn post(&self, path: &str, params: &[(&str, &str)], body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} {:?}", url, params);
        let mut request = self.http.post(&url).json(body);
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = self.authorize(request).send().await?;
        self.json_response(path, response).await
    }

    /// POST on behalf of the base wallet, ignoring any active sub-wallet
    pub async fn post_as_base(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (base wallet)", url);
        let response = self.http.post(&url).json(body).send().await?;
        self.json_response(path, response).await
    }

    /// Check readiness once.
    ///
    /// Calls GET /status/ready and returns whether the agent reports ready.
    pub async fn is_ready(&self) -> bool {
        match self.get("/status/ready").await {
            Ok(body) => body.get("ready").and_then(Value::as_bool).unwrap_or(false),
            Err(e) => {
                debug!("Agent not ready yet: {}", e);
                false
            }
        }
    }

    /// Poll readiness until the agent is up or the timeout elapses
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let poll = async {
            while !self.is_ready().await {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.wallet_token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn json_response(&self, path: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Admin {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}
