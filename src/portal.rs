//! Application wiring: one `Portal` is built at startup and owns the session store,
//! the route guard and the REST client. UI code holds a reference to it instead of
//! reaching for globals.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::api::ApiClient;
use crate::config::PortalConfig;
use crate::error::AuthError;
use crate::identity::{AuthProvider, Credentials, FileTokenStore, HttpAuthProvider, Identity, SessionStore, TokenStore};
use crate::routes::{access_level, home_route_for, normalize_path, Access, RouteDecision, RouteGuard};

/// Result of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    pub decision: RouteDecision,
    /// Where the user ends up.
    pub path: String,
    /// One-shot message to show on arrival (session expiry).
    pub notice: Option<&'static str>,
    pub access: Access,
}

pub struct Portal {
    config: PortalConfig,
    session: Arc<SessionStore>,
    guard: RouteGuard,
    api: ApiClient,
}

impl Portal {
    pub fn from_config(config: PortalConfig) -> anyhow::Result<Self> {
        let provider = HttpAuthProvider::new(&config.api_base_url, config.request_timeout)?;
        let tokens = FileTokenStore::new(&config.token_dir);
        Self::with_parts(config, Arc::new(provider), Arc::new(tokens))
    }

    pub fn with_parts(config: PortalConfig, provider: Arc<dyn AuthProvider>, tokens: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let session = Arc::new(SessionStore::new(provider, tokens));
        let guard = RouteGuard::new(session.clone());
        let api = ApiClient::new(&config.api_base_url, config.request_timeout, session.clone())
            .with_context(|| format!("building API client for {}", config.api_base_url))?;
        Ok(Self { config, session, guard, api })
    }

    pub fn config(&self) -> &PortalConfig { &self.config }
    pub fn session(&self) -> &Arc<SessionStore> { &self.session }
    pub fn guard(&self) -> &RouteGuard { &self.guard }
    pub fn api(&self) -> &ApiClient { &self.api }

    /// Restore a persisted session, if any.
    pub async fn start(&self) -> Option<Identity> {
        let restored = self.session.restore(self.config.verify_on_start).await;
        info!(target: "portal", api = %self.config.api_base_url, signed_in = restored.is_some(), "portal started");
        restored
    }

    /// Log in and return the landing route for the new identity.
    pub async fn login(&self, creds: &Credentials) -> Result<(Identity, &'static str), AuthError> {
        let identity = self.session.login(creds).await?;
        let home = home_route_for(&identity);
        Ok((identity, home))
    }

    pub async fn logout(&self) { self.session.logout().await }

    pub fn navigate(&self, path: &str) -> Navigation {
        let requested = normalize_path(path);
        let decision = self.guard.check(&requested);
        let path = decision.target().map(|s| s.to_string()).unwrap_or_else(|| requested.clone());
        let notice = match decision {
            RouteDecision::RedirectToLogin => self.session.take_expired_notice(),
            _ => None,
        };
        let position = self.session.current_identity().and_then(|i| i.position());
        let access = access_level(&path, position);
        Navigation { requested, decision, path, notice, access }
    }
}
