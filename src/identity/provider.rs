use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::claims::TokenClaims;
use super::principal::{Identity, Position, Role};
use crate::error::AuthError;

/// What the login form submits. Students sign in by student ID, officers by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Student { student_id: String, password: String },
    Staff { username: String, password: String },
}

impl Credentials {
    pub fn login_name(&self) -> &str {
        match self {
            Credentials::Student { student_id, .. } => student_id,
            Credentials::Staff { username, .. } => username,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Credentials::Student { password, .. } | Credentials::Staff { password, .. } => password,
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        match self {
            Credentials::Student { student_id, password } => serde_json::json!({"studentId": student_id, "password": password}),
            Credentials::Staff { username, password } => serde_json::json!({"username": username, "password": password}),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl LoginResponse {
    /// Resolve the identity: token subject first, then the profile id, then the login name.
    pub fn identity(&self, login_name: &str) -> Identity {
        let id = TokenClaims::decode(&self.token)
            .map(|c| c.sub)
            .ok()
            .or_else(|| {
                ["id", "studentId", "username"]
                    .iter()
                    .find_map(|k| self.profile.get(*k).and_then(|v| v.as_str()).map(|s| s.to_string()))
            })
            .unwrap_or_else(|| login_name.to_string());
        Identity::from_parts(id, self.role, self.position)
    }
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

/// The backend auth endpoints as seen by the session store.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self, creds: &Credentials) -> Result<LoginResponse, AuthError>;
    /// Best-effort server-side invalidation.
    async fn logout(&self, token: &str) -> anyhow::Result<()>;
    /// Resolve the identity behind a stored token; 401 means the token is no longer valid.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

pub struct HttpAuthProvider {
    base: Url,
    client: reqwest::Client,
}

impl HttpAuthProvider {
    pub fn new(base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base).map_err(|e| anyhow::anyhow!("invalid API base URL '{}': {}", base, e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> Result<Url, AuthError> {
        self.base.join(path).map_err(|e| AuthError::BadRequest(format!("bad endpoint {}: {}", path, e)))
    }
}

pub(crate) async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str::<MessageBody>(&text)
        .map(|b| b.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn login(&self, creds: &Credentials) -> Result<LoginResponse, AuthError> {
        let url = self.url("/auth/login")?;
        let resp = self.client.post(url).json(&creds.to_body()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = error_message(resp).await;
            debug!(target: "auth", status = status.as_u16(), user = creds.login_name(), "login rejected: {}", msg);
            return Err(AuthError::from_status(status.as_u16(), &msg));
        }
        resp.json::<LoginResponse>()
            .await
            .map_err(|e| AuthError::Server { status: status.as_u16(), message: format!("unreadable login response: {}", e) })
    }

    async fn logout(&self, token: &str) -> anyhow::Result<()> {
        let url = self.base.join("/auth/logout")?;
        let resp = self.client.post(url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("logout failed: HTTP {}", resp.status()));
        }
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let url = self.url("/auth/me")?;
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials(error_message(resp).await));
        }
        if !status.is_success() {
            let msg = error_message(resp).await;
            warn!(target: "auth", status = status.as_u16(), "token verification failed: {}", msg);
            return Err(AuthError::from_status(status.as_u16(), &msg));
        }
        resp.json::<Identity>()
            .await
            .map_err(|e| AuthError::Server { status: status.as_u16(), message: format!("unreadable identity: {}", e) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_body_uses_backend_field_names() {
        let s = Credentials::Student { student_id: "2020-1".into(), password: "pw".into() };
        assert_eq!(s.to_body(), serde_json::json!({"studentId": "2020-1", "password": "pw"}));
        let a = Credentials::Staff { username: "treasurer".into(), password: "pw".into() };
        assert_eq!(a.to_body()["username"], "treasurer");
    }

    #[test]
    fn identity_falls_back_to_profile_then_login_name() {
        let resp = LoginResponse {
            token: "opaque".into(),
            role: Role::Student,
            position: None,
            profile: serde_json::json!({"studentId": "2019-77"}),
        };
        assert_eq!(resp.identity("ignored").id(), "2019-77");
        let bare = LoginResponse { profile: serde_json::Value::Null, ..resp };
        assert_eq!(bare.identity("2019-88").id(), "2019-88");
    }

    #[test]
    fn identity_prefers_token_subject() {
        let claims = TokenClaims { sub: "adm-9".into(), role: Role::Admin, position: Some(Position::Executive), exp: 2_000_000_000, iat: None };
        let resp = LoginResponse {
            token: claims.encode(b"s"),
            role: Role::Admin,
            position: Some(Position::Executive),
            profile: serde_json::json!({"id": "other"}),
        };
        assert_eq!(resp.identity("x"), Identity::admin("adm-9", Position::Executive));
    }
}
