//! REST client for the portal backend.
//!
//! Authenticated calls carry the session's bearer token. A 401 on any of them ends the
//! session through `SessionStore::on_session_expired`, unless the token has since been
//! replaced. The password recovery calls are public and never touch the session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::identity::{error_message, SessionStore};

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration, session: Arc<SessionStore>) -> ApiResult<Self> {
        let base = Url::parse(base).map_err(|e| ApiError::Url(format!("{}: {}", base, e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client, session })
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base.join(path).map_err(|e| ApiError::Url(format!("{}: {}", path, e)))
    }

    async fn read_body(resp: reqwest::Response) -> ApiResult<Value> {
        let text = resp.text().await?;
        if text.trim().is_empty() { return Ok(Value::Null); }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Send an authenticated request and return the JSON body.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let Some(token) = self.session.token() else {
            return Err(ApiError::NotAuthenticated);
        };
        let url = self.url(path)?;
        let mut req = self.client.request(method.clone(), url).bearer_auth(&token);
        if let Some(b) = body { req = req.json(b); }
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(target: "api", %method, path, "authenticated call rejected; ending session");
            self.session.on_session_expired(&token);
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            let message = error_message(resp).await;
            debug!(target: "api", %method, path, status = status.as_u16(), "request failed: {}", message);
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        Self::read_body(resp).await
    }

    pub async fn get_json(&self, path: &str) -> ApiResult<Value> { self.send(Method::GET, path, None).await }

    pub async fn post_json(&self, path: &str, body: &Value) -> ApiResult<Value> { self.send(Method::POST, path, Some(body)).await }

    async fn post_public(&self, path: &str, body: Value) -> ApiResult<Value> {
        let resp = self.client.post(self.url(path)?).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        Self::read_body(resp).await
    }

    pub async fn request_recovery_token(&self, email: &str) -> ApiResult<()> {
        self.post_public("/recovery-token/request", json!({"email": email})).await.map(|_| ())
    }

    /// True when the backend accepts the emailed recovery token.
    pub async fn validate_recovery_token(&self, email: &str, token: &str) -> ApiResult<bool> {
        match self.post_public("/recovery-token/validate", json!({"email": email, "token": token})).await {
            Ok(v) => Ok(v.get("valid").and_then(|b| b.as_bool()).unwrap_or(true)),
            Err(ApiError::Status { status: 400 | 404 | 410, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn reset_password(&self, email: &str, token: &str, new_password: &str) -> ApiResult<()> {
        self.post_public("/reset-password", json!({"email": email, "token": token, "newPassword": new_password}))
            .await
            .map(|_| ())
    }
}
