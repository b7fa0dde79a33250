//! Session store: the single owner of the current identity and of the persisted token.
//!
//! Constructed once at startup and shared as `Arc<SessionStore>`. Readers either poll
//! `current_identity()` or hold a `watch` receiver from `subscribe()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::claims::TokenClaims;
use super::principal::Identity;
use super::provider::{AuthProvider, Credentials};
use super::storage::TokenStore;
use crate::error::AuthError;

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    /// Set when the session ended because the backend rejected the token.
    pub expired: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool { self.identity.is_some() }
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    token: Option<String>,
    expired: bool,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { identity: self.identity.clone(), expired: self.expired }
    }
}

pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
    // bumped on every commit (login, restore, logout, expiry); an async operation that
    // started under an older value must not write its result
    generation: AtomicU64,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn AuthProvider>, tokens: Arc<dyn TokenStore>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { provider, tokens, state: RwLock::new(SessionState::default()), generation: AtomicU64::new(0), tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> { self.tx.subscribe() }

    pub fn snapshot(&self) -> SessionSnapshot { self.state.read().snapshot() }

    pub fn current_identity(&self) -> Option<Identity> { self.state.read().identity.clone() }

    pub fn is_authenticated(&self) -> bool {
        let st = self.state.read();
        st.identity.is_some() && st.token.is_some()
    }

    /// Bearer token for authenticated calls, if signed in.
    pub fn token(&self) -> Option<String> { self.state.read().token.clone() }

    fn publish(&self, snap: SessionSnapshot) {
        // no receivers is fine
        let _ = self.tx.send_replace(snap);
    }

    /// Sign in through the auth provider. On failure the current state is left untouched.
    /// Network failures are not retried.
    pub async fn login(&self, creds: &Credentials) -> Result<Identity, AuthError> {
        let started_at = self.generation.load(Ordering::SeqCst);
        let resp = match self.provider.login(creds).await {
            Ok(r) => r,
            Err(e) => {
                info!(target: "session", user = creds.login_name(), "login failed: {}", e);
                return Err(e);
            }
        };
        let identity = resp.identity(creds.login_name());

        let snap = {
            let mut st = self.state.write();
            if self.generation.load(Ordering::SeqCst) != started_at {
                warn!(target: "session", user = %identity.id(), "discarding login superseded by a newer session change");
                return Err(AuthError::Superseded);
            }
            // a session that cannot be persisted would vanish on restart
            if let Err(e) = self.tokens.save(&resp.token) {
                warn!(target: "session", user = %identity.id(), "failed to persist token: {:#}", e);
                return Err(AuthError::Storage(format!("{:#}", e)));
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            st.identity = Some(identity.clone());
            st.token = Some(resp.token);
            st.expired = false;
            st.snapshot()
        };
        self.publish(snap);
        info!(target: "session", identity = %identity, "login ok");
        Ok(identity)
    }

    /// Always clears local state; remote invalidation is best-effort and only logged.
    pub async fn logout(&self) {
        let (token, snap) = {
            let mut st = self.state.write();
            self.generation.fetch_add(1, Ordering::SeqCst);
            let token = st.token.take();
            st.identity = None;
            st.expired = false;
            (token, st.snapshot())
        };
        self.clear_slot();
        self.publish(snap);

        let Some(token) = token else { return; };
        info!(target: "session", "logout");
        if let Err(e) = self.provider.logout(&token).await {
            warn!(target: "session", "remote logout failed (session cleared locally): {:#}", e);
        }
    }

    /// Called by any collaborator that saw a 401 on a call made with `token`.
    /// A rejection of a token that is no longer current is ignored. Only updates state;
    /// navigation happens when the route guard next runs.
    pub fn on_session_expired(&self, token: &str) {
        let snap = {
            let mut st = self.state.write();
            if st.token.as_deref() != Some(token) {
                debug!(target: "session", "ignoring 401 for a token that is no longer current");
                return;
            }
            self.expire_locked(&mut st)
        };
        warn!(target: "session", "session expired");
        self.publish(snap);
    }

    fn expire_locked(&self, st: &mut SessionState) -> SessionSnapshot {
        self.generation.fetch_add(1, Ordering::SeqCst);
        st.identity = None;
        st.token = None;
        st.expired = true;
        self.clear_slot();
        st.snapshot()
    }

    fn clear_slot(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(target: "session", "failed to clear persisted token: {:#}", e);
        }
    }

    /// Returns the expiry notice once, then clears the flag.
    pub fn take_expired_notice(&self) -> Option<&'static str> {
        let snap = {
            let mut st = self.state.write();
            if !st.expired { return None; }
            st.expired = false;
            st.snapshot()
        };
        self.publish(snap);
        Some(SESSION_EXPIRED_NOTICE)
    }

    /// Rebuild the session from the persisted token at startup.
    ///
    /// A missing slot means signed out. An unreadable or expired token is cleared.
    /// With `verify`, the backend confirms the token; a rejection is handled as expiry,
    /// while an unreachable backend keeps the locally decoded identity. If a login or
    /// logout commits while verification is in flight, that newer state is kept.
    pub async fn restore(&self, verify: bool) -> Option<Identity> {
        let started_at = self.generation.load(Ordering::SeqCst);
        let token = match self.tokens.load() {
            Ok(Some(t)) => t,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "session", "failed to read persisted token: {:#}", e);
                return None;
            }
        };
        let claims = match TokenClaims::decode(&token) {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "session", "discarding unreadable persisted token: {}", e);
                let _st = self.state.write();
                if self.generation.load(Ordering::SeqCst) == started_at {
                    self.clear_slot();
                }
                return None;
            }
        };
        if claims.is_expired() {
            info!(target: "session", user = %claims.sub, "persisted token expired");
            let snap = {
                let mut st = self.state.write();
                if self.generation.load(Ordering::SeqCst) != started_at {
                    return None;
                }
                self.clear_slot();
                st.expired = true;
                st.snapshot()
            };
            self.publish(snap);
            return None;
        }

        let mut identity = claims.identity();
        if verify {
            match self.provider.verify(&token).await {
                Ok(confirmed) => identity = confirmed,
                Err(AuthError::InvalidCredentials(_)) => {
                    let snap = {
                        let mut st = self.state.write();
                        if self.generation.load(Ordering::SeqCst) != started_at {
                            debug!(target: "session", "persisted token rejected after a newer session change; keeping it");
                            return None;
                        }
                        self.expire_locked(&mut st)
                    };
                    warn!(target: "session", user = %claims.sub, "persisted token rejected by backend");
                    self.publish(snap);
                    return None;
                }
                Err(e) => warn!(target: "session", "could not verify persisted token, keeping local identity: {}", e),
            }
        }
        let snap = {
            let mut st = self.state.write();
            if self.generation.load(Ordering::SeqCst) != started_at {
                debug!(target: "session", "discarding restore superseded by a newer session change");
                return None;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            st.identity = Some(identity.clone());
            st.token = Some(token);
            st.expired = false;
            st.snapshot()
        };
        self.publish(snap);
        info!(target: "session", identity = %identity, "session restored");
        Some(identity)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
