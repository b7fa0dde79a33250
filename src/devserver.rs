//!
//! campus_portal development backend
//! ----------------------------------
//! An in-memory Axum implementation of the portal's auth endpoints, used for local
//! development and by the integration tests. It mirrors the production contract:
//!
//! - `POST /auth/login` with `{studentId|username, password}` returns `{token, role, position, profile}`.
//! - `POST /auth/logout` and `GET /auth/me` take a bearer token.
//! - Password recovery: `/recovery-token/request`, `/recovery-token/validate`, `/reset-password`.
//! - Failures are non-2xx with a `{message}` body (401 invalid credentials, 403 disabled,
//!   404 unknown account, 429 while an account is locked out after repeated failures).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{extract::State, Json, Router};
use password_hash::{PasswordHash, SaltString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{Identity, Position, Role, TokenClaims};

pub const DEFAULT_DEV_PORT: u16 = 7880;
/// Consecutive failed logins before an account is throttled.
pub const MAX_FAILED_LOGINS: u32 = 5;
/// How long a throttled account stays locked after its last failure.
pub const LOCKOUT_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct Account {
    pub login: String,
    pub id: String,
    pub role: Role,
    pub position: Option<Position>,
    pub email: String,
    pub disabled: bool,
    password_hash: String,
    failures: u32,
    last_failure: Option<chrono::DateTime<chrono::Utc>>,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity::from_parts(self.id.clone(), self.role, self.position)
    }

    fn locked_out(&self, now: chrono::DateTime<chrono::Utc>, window: chrono::Duration) -> bool {
        self.failures >= MAX_FAILED_LOGINS && self.last_failure.is_some_and(|t| now < t + window)
    }

    fn clear_failures(&mut self) {
        self.failures = 0;
        self.last_failure = None;
    }

    fn profile(&self) -> serde_json::Value {
        let login_key = if self.role == Role::Student { "studentId" } else { "username" };
        let mut m = serde_json::Map::new();
        m.insert("id".into(), json!(self.id));
        m.insert(login_key.into(), json!(self.login));
        m.insert("email".into(), json!(self.email));
        serde_json::Value::Object(m)
    }
}

/// Shared state injected into all handlers.
#[derive(Clone)]
pub struct DevState {
    /// login name -> account
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    /// token -> login name
    sessions: Arc<RwLock<HashMap<String, String>>>,
    /// email -> recovery code
    recovery: Arc<RwLock<HashMap<String, String>>>,
    token_ttl: chrono::Duration,
    lockout: chrono::Duration,
}

impl Default for DevState {
    fn default() -> Self { Self::new(chrono::Duration::hours(8)) }
}

// dev-only cost parameters; production hashes live on the real backend
fn argon2() -> Argon2<'static> {
    match Params::new(1024, 1, 1, None) {
        Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        Err(_) => Argon2::default(),
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let phc = argon2().hash_password(password.as_bytes(), &salt).map_err(|e| anyhow::anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => argon2().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn random_bytes<const N: usize>() -> anyhow::Result<[u8; N]> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow::anyhow!("system random source failed: {e}"))?;
    Ok(buf)
}

impl DevState {
    pub fn new(token_ttl: chrono::Duration) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recovery: Arc::new(RwLock::new(HashMap::new())),
            token_ttl,
            lockout: chrono::Duration::seconds(LOCKOUT_WINDOW_SECS),
        }
    }

    /// Demo accounts, one per role/position, plus a disabled student.
    pub async fn seeded() -> anyhow::Result<Self> {
        let st = Self::default();
        st.add_account("2021-00001", Role::Student, None, "student123", "student@campus.example").await?;
        st.add_account("president", Role::Admin, Some(Position::Executive), "executive123", "president@campus.example").await?;
        st.add_account("treasurer", Role::Admin, Some(Position::Finance), "finance123", "treasurer@campus.example").await?;
        st.add_account("secretary", Role::Admin, Some(Position::General), "general123", "secretary@campus.example").await?;
        st.add_account("2019-99999", Role::Student, None, "student123", "alumni@campus.example").await?;
        st.set_disabled("2019-99999", true).await;
        Ok(st)
    }

    pub async fn add_account(&self, login: &str, role: Role, position: Option<Position>, password: &str, email: &str) -> anyhow::Result<()> {
        let acct = Account {
            login: login.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            role,
            position,
            email: email.to_string(),
            disabled: false,
            password_hash: hash_password(password)?,
            failures: 0,
            last_failure: None,
        };
        self.accounts.write().await.insert(login.to_string(), acct);
        Ok(())
    }

    pub async fn set_disabled(&self, login: &str, disabled: bool) {
        if let Some(a) = self.accounts.write().await.get_mut(login) {
            a.disabled = disabled;
        }
    }

    pub async fn account(&self, login: &str) -> Option<Account> { self.accounts.read().await.get(login).cloned() }

    /// Drop every issued token of an account, so its next authenticated call gets a 401.
    pub async fn revoke_sessions_for(&self, login: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, l| l.as_str() != login);
        let count = before - sessions.len();
        info!(target: "devserver", login, count, "sessions revoked");
        count
    }

    pub async fn active_sessions(&self) -> usize { self.sessions.read().await.len() }

    /// The outstanding recovery code for an email; stands in for the mailbox.
    pub async fn recovery_code(&self, email: &str) -> Option<String> { self.recovery.read().await.get(email).cloned() }

    fn issue_token(&self, acct: &Account) -> anyhow::Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            sub: acct.id.clone(),
            role: acct.role,
            position: acct.position,
            exp: now + self.token_ttl.num_seconds(),
            iat: Some(now),
        };
        Ok(claims.encode(&random_bytes::<32>()?))
    }

    /// Record a new session, dropping entries whose token has expired.
    async fn insert_session(&self, token: String, login: String) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|t, _| TokenClaims::decode(t).map(|c| !c.is_expired()).unwrap_or(false));
        let swept = before - sessions.len();
        if swept > 0 {
            debug!(target: "devserver", swept, "expired sessions dropped");
        }
        sessions.insert(token, login);
    }

    async fn login_for_token(&self, token: &str) -> Option<String> {
        let login = self.sessions.read().await.get(token).cloned()?;
        match TokenClaims::decode(token) {
            Ok(c) if !c.is_expired() => Some(login),
            _ => {
                self.sessions.write().await.remove(token);
                None
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get("authorization")?.to_str().ok()?;
    let (scheme, tok) = v.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let tok = tok.trim();
    if tok.is_empty() { None } else { Some(tok.to_string()) }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecoveryRequestPayload { email: String }

#[derive(Debug, Deserialize)]
struct RecoveryValidatePayload { email: String, token: String }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPayload { email: String, token: String, new_password: String }

async fn login(State(state): State<DevState>, Json(payload): Json<LoginPayload>) -> AppResult<Json<serde_json::Value>> {
    let login_name = payload.student_id.or(payload.username).filter(|s| !s.trim().is_empty());
    let password = payload.password.filter(|s| !s.is_empty());
    let (Some(login_name), Some(password)) = (login_name, password) else {
        return Err(AppError::user("missing_fields", "studentId or username and password are required"));
    };

    let mut accounts = state.accounts.write().await;
    let Some(acct) = accounts.get_mut(login_name.trim()) else {
        return Err(AppError::not_found("account_not_found", "account not found"));
    };
    if acct.disabled {
        return Err(AppError::forbidden("account_disabled", "account disabled"));
    }
    let now = chrono::Utc::now();
    if acct.locked_out(now, state.lockout) {
        warn!(target: "devserver", login = %acct.login, "login throttled");
        return Err(AppError::rate_limited("rate_limited", "too many failed attempts, try again later"));
    }
    if acct.failures >= MAX_FAILED_LOGINS {
        acct.clear_failures();
    }
    if !verify_password(&acct.password_hash, &password) {
        acct.failures += 1;
        acct.last_failure = Some(now);
        return Err(AppError::auth("invalid_credentials", "invalid credentials"));
    }
    acct.clear_failures();
    let acct = acct.clone();
    drop(accounts);

    let token = state.issue_token(&acct).map_err(|e| {
        error!(target: "devserver", "token issue failed: {e:#}");
        AppError::internal("token_issue_failed", "could not start a session")
    })?;
    state.insert_session(token.clone(), acct.login.clone()).await;
    info!(target: "devserver", login = %acct.login, role = %acct.role, "login ok");
    Ok(Json(json!({
        "token": token,
        "role": acct.role,
        "position": acct.position,
        "profile": acct.profile(),
    })))
}

async fn logout(State(state): State<DevState>, headers: HeaderMap) -> AppResult<Json<serde_json::Value>> {
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::auth("missing_token", "missing bearer token"));
    };
    if state.sessions.write().await.remove(&token).is_none() {
        return Err(AppError::auth("session_expired", "session expired"));
    }
    Ok(Json(json!({"status": "ok"})))
}

async fn authenticated(state: &DevState, headers: &HeaderMap) -> AppResult<Account> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::auth("missing_token", "missing bearer token"));
    };
    let Some(login) = state.login_for_token(&token).await else {
        return Err(AppError::auth("session_expired", "session expired"));
    };
    state.account(&login).await.ok_or_else(|| AppError::auth("session_expired", "session expired"))
}

async fn me(State(state): State<DevState>, headers: HeaderMap) -> AppResult<Json<Identity>> {
    let acct = authenticated(&state, &headers).await?;
    Ok(Json(acct.identity()))
}

async fn profile(State(state): State<DevState>, headers: HeaderMap) -> AppResult<Json<serde_json::Value>> {
    let acct = authenticated(&state, &headers).await?;
    Ok(Json(acct.profile()))
}

async fn recovery_request(State(state): State<DevState>, Json(payload): Json<RecoveryRequestPayload>) -> AppResult<Json<serde_json::Value>> {
    let known = state.accounts.read().await.values().any(|a| a.email == payload.email);
    if known {
        let bytes = random_bytes::<4>().map_err(|e| {
            error!(target: "devserver", "recovery code generation failed: {e:#}");
            AppError::internal("recovery_failed", "could not issue a recovery code")
        })?;
        let n = u32::from_le_bytes(bytes) % 1_000_000;
        let code = format!("{:06}", n);
        state.recovery.write().await.insert(payload.email.clone(), code);
        info!(target: "devserver", email = %payload.email, "recovery code issued");
    }
    // same answer either way so emails cannot be probed
    Ok(Json(json!({"message": "if the email is registered, a recovery code has been sent"})))
}

async fn code_matches(state: &DevState, email: &str, token: &str) -> bool {
    state.recovery.read().await.get(email).map(|c| c == token).unwrap_or(false)
}

async fn recovery_validate(State(state): State<DevState>, Json(payload): Json<RecoveryValidatePayload>) -> AppResult<Json<serde_json::Value>> {
    if !code_matches(&state, &payload.email, &payload.token).await {
        return Err(AppError::user("invalid_recovery_token", "invalid or expired recovery token"));
    }
    Ok(Json(json!({"valid": true})))
}

async fn reset_password(State(state): State<DevState>, Json(payload): Json<ResetPayload>) -> AppResult<Json<serde_json::Value>> {
    if !code_matches(&state, &payload.email, &payload.token).await {
        return Err(AppError::user("invalid_recovery_token", "invalid or expired recovery token"));
    }
    if payload.new_password.len() < 8 {
        return Err(AppError::user("weak_password", "password must be at least 8 characters"));
    }
    let hash = hash_password(&payload.new_password).map_err(|e| {
        error!(target: "devserver", "hashing failed: {e}");
        AppError::internal("hash_failed", "could not update password")
    })?;
    let login = {
        let mut accounts = state.accounts.write().await;
        let Some(acct) = accounts.values_mut().find(|a| a.email == payload.email) else {
            return Err(AppError::not_found("account_not_found", "account not found"));
        };
        acct.password_hash = hash;
        acct.clear_failures();
        acct.login.clone()
    };
    state.recovery.write().await.remove(&payload.email);
    state.revoke_sessions_for(&login).await;
    Ok(Json(json!({"status": "ok"})))
}

pub fn router(state: DevState) -> Router {
    Router::new()
        .route("/health", get(|| async { "campus_portal dev backend ok" }))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/profile", get(profile))
        .route("/recovery-token/request", post(recovery_request))
        .route("/recovery-token/validate", post(recovery_validate))
        .route("/reset-password", post(reset_password))
        .with_state(state)
}

pub async fn run_with_port(http_port: u16, state: DevState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting dev backend on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Serve on an ephemeral localhost port in the background; returns the bound address.
pub async fn spawn_local(state: DevState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    crate::tprintln!("dev backend listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            error!(target: "devserver", "dev backend stopped: {e}");
        }
    });
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let h = hash_password("s3cret-pass").unwrap();
        assert!(verify_password(&h, "s3cret-pass"));
        assert!(!verify_password(&h, "wrong"));
        assert!(!verify_password("not-a-phc", "s3cret-pass"));
    }

    #[test]
    fn bearer_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&h).as_deref(), Some("abc.def.ghi"));
        h.insert("authorization", "Basic Zm9v".parse().unwrap());
        assert_eq!(bearer_token(&h), None);
    }

    #[tokio::test]
    async fn issued_tokens_decode_to_the_account() {
        let st = DevState::default();
        st.add_account("treasurer", Role::Admin, Some(Position::Finance), "finance123", "t@x").await.unwrap();
        let acct = st.account("treasurer").await.unwrap();
        let token = st.issue_token(&acct).unwrap();
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.identity(), Identity::admin(acct.id.clone(), Position::Finance));
        assert!(!claims.is_expired());
        // random signatures, so two tokens issued in the same second still differ
        assert_ne!(token, st.issue_token(&acct).unwrap());
        assert_ne!(random_bytes::<32>().unwrap(), [0u8; 32]);
    }

    async fn try_login(st: &DevState, user: &str, pw: &str) -> AppResult<Json<serde_json::Value>> {
        let payload = LoginPayload { student_id: None, username: Some(user.into()), password: Some(pw.into()) };
        login(State(st.clone()), Json(payload)).await
    }

    fn status_of(res: AppResult<Json<serde_json::Value>>) -> u16 {
        match res {
            Ok(_) => 200,
            Err(e) => e.http_status(),
        }
    }

    #[tokio::test]
    async fn lockout_lifts_after_window() {
        let st = DevState::default();
        st.add_account("treasurer", Role::Admin, Some(Position::Finance), "finance123", "t@x").await.unwrap();
        for _ in 0..MAX_FAILED_LOGINS {
            assert_eq!(status_of(try_login(&st, "treasurer", "wrong").await), 401);
        }
        assert_eq!(status_of(try_login(&st, "treasurer", "finance123").await), 429);

        {
            let mut accounts = st.accounts.write().await;
            let acct = accounts.get_mut("treasurer").unwrap();
            acct.last_failure = acct.last_failure.map(|t| t - st.lockout - chrono::Duration::seconds(1));
        }
        assert_eq!(status_of(try_login(&st, "treasurer", "finance123").await), 200);
        let acct = st.account("treasurer").await.unwrap();
        assert_eq!(acct.failures, 0);
        assert_eq!(acct.last_failure, None);
    }

    #[tokio::test]
    async fn login_sweeps_expired_sessions() {
        // every token is issued already expired
        let st = DevState::new(chrono::Duration::seconds(-1));
        st.add_account("secretary", Role::Admin, Some(Position::General), "general123", "s@x").await.unwrap();
        assert_eq!(status_of(try_login(&st, "secretary", "general123").await), 200);
        assert_eq!(status_of(try_login(&st, "secretary", "general123").await), 200);
        assert_eq!(st.active_sessions().await, 1);
    }
}
