//! End-to-end session lifecycle against the in-process dev backend:
//! login classification, landing routes, persistence across restarts, expiry, logout,
//! and the public password recovery calls.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::{tempdir, TempDir};

use campus_portal::config::PortalConfig;
use campus_portal::devserver::{spawn_local, DevState, MAX_FAILED_LOGINS};
use campus_portal::error::{ApiError, AuthError};
use campus_portal::identity::{Credentials, FileTokenStore, HttpAuthProvider, Position, Role, TokenStore, SESSION_EXPIRED_NOTICE};
use campus_portal::portal::Portal;
use campus_portal::routes::{Access, RouteDecision};

struct Harness {
    state: DevState,
    config: PortalConfig,
    _tmp: TempDir,
}

impl Harness {
    async fn start() -> Result<Self> {
        let state = DevState::seeded().await?;
        let addr = spawn_local(state.clone()).await?;
        let tmp = tempdir()?;
        let config = PortalConfig {
            api_base_url: format!("http://{}", addr),
            token_dir: tmp.path().to_path_buf(),
            request_timeout: Duration::from_secs(5),
            verify_on_start: true,
        };
        Ok(Self { state, config, _tmp: tmp })
    }

    fn portal(&self) -> Result<Portal> { Portal::from_config(self.config.clone()) }

    fn tokens(&self) -> FileTokenStore { FileTokenStore::new(&self.config.token_dir) }
}

fn student(id: &str, pw: &str) -> Credentials {
    Credentials::Student { student_id: id.into(), password: pw.into() }
}

fn staff(user: &str, pw: &str) -> Credentials {
    Credentials::Staff { username: user.into(), password: pw.into() }
}

#[tokio::test]
async fn wrong_password_keeps_session_signed_out() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;
    let err = portal.login(&student("2021-00001", "nope")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(ref m) if m.contains("invalid")), "{:?}", err);
    assert!(err.user_message().starts_with("Invalid student ID or password"));
    assert!(!portal.session().is_authenticated());
    assert_eq!(h.tokens().load()?, None);
    Ok(())
}

#[tokio::test]
async fn login_errors_are_classified() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;
    assert!(matches!(portal.login(&student("1999-00000", "x")).await, Err(AuthError::NotFound(_))));
    assert!(matches!(portal.login(&student("2019-99999", "student123")).await, Err(AuthError::AccountDisabled(_))));
    assert!(matches!(portal.login(&student("", "x")).await, Err(AuthError::BadRequest(_))));

    for _ in 0..MAX_FAILED_LOGINS {
        let _ = portal.login(&staff("treasurer", "wrong")).await;
    }
    assert!(matches!(portal.login(&staff("treasurer", "finance123")).await, Err(AuthError::RateLimited(_))));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() -> Result<()> {
    let tmp = tempdir()?;
    let config = PortalConfig {
        // port 9 (discard) is not serving HTTP
        api_base_url: "http://127.0.0.1:9".into(),
        token_dir: tmp.path().to_path_buf(),
        request_timeout: Duration::from_secs(2),
        verify_on_start: false,
    };
    let portal = Portal::from_config(config)?;
    let err = portal.login(&student("2021-00001", "student123")).await.unwrap_err();
    assert!(matches!(err, AuthError::Network(_)), "{:?}", err);
    assert!(!portal.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn each_role_lands_on_its_home() -> Result<()> {
    let h = Harness::start().await?;
    let cases = [
        (student("2021-00001", "student123"), Role::Student, None, "/dashboard"),
        (staff("president", "executive123"), Role::Admin, Some(Position::Executive), "/admin/dashboard"),
        (staff("treasurer", "finance123"), Role::Admin, Some(Position::Finance), "/admin/finance"),
        (staff("secretary", "general123"), Role::Admin, Some(Position::General), "/admin/finance"),
    ];
    for (creds, role, position, home) in cases {
        let portal = h.portal()?;
        let (identity, landing) = portal.login(&creds).await.map_err(|e| anyhow::anyhow!("{}", e))?;
        assert_eq!(identity.role(), role);
        assert_eq!(identity.position(), position);
        assert_eq!(landing, home);
        assert_eq!(portal.navigate(home).decision, RouteDecision::Allow);
        portal.logout().await;
    }
    Ok(())
}

#[tokio::test]
async fn navigation_follows_the_guard() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;

    let nav = portal.navigate("/admin/dashboard");
    assert_eq!(nav.decision, RouteDecision::RedirectToLogin);
    assert_eq!(nav.path, "/login");
    assert_eq!(nav.notice, None);

    portal.login(&staff("secretary", "general123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    let nav = portal.navigate("/admin/dashboard");
    assert_eq!(nav.decision, RouteDecision::RedirectToRoleHome("/admin/finance".into()));
    assert_eq!(nav.path, "/admin/finance");
    assert_eq!(nav.access, Access::ReadOnly);

    let nav = portal.navigate("/cart");
    assert_eq!(nav.path, "/admin/finance");
    Ok(())
}

#[tokio::test]
async fn session_survives_restart_via_token_slot() -> Result<()> {
    let h = Harness::start().await?;
    let first = h.portal()?;
    let (identity, _) = first.login(&staff("president", "executive123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    assert!(h.tokens().load()?.is_some());
    drop(first);

    let second = h.portal()?;
    assert!(!second.session().is_authenticated());
    let restored = second.start().await;
    assert_eq!(restored, Some(identity));
    assert_eq!(second.navigate("/admin/students").decision, RouteDecision::Allow);
    Ok(())
}

#[tokio::test]
async fn revoked_token_expires_session_on_next_call() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;
    portal.login(&student("2021-00001", "student123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;

    let profile = portal.api().get_json("/profile").await?;
    assert_eq!(profile["studentId"], "2021-00001");

    assert_eq!(h.state.revoke_sessions_for("2021-00001").await, 1);
    let err = portal.api().get_json("/profile").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!portal.session().is_authenticated());
    assert_eq!(h.tokens().load()?, None);

    let nav = portal.navigate("/dashboard");
    assert_eq!(nav.decision, RouteDecision::RedirectToLogin);
    assert_eq!(nav.notice, Some(SESSION_EXPIRED_NOTICE));
    // shown once
    assert_eq!(portal.navigate("/dashboard").notice, None);
    Ok(())
}

#[tokio::test]
async fn restart_with_revoked_token_is_signed_out() -> Result<()> {
    let h = Harness::start().await?;
    let first = h.portal()?;
    first.login(&staff("treasurer", "finance123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    h.state.revoke_sessions_for("treasurer").await;

    let second = h.portal()?;
    assert_eq!(second.start().await, None);
    assert!(second.session().snapshot().expired);
    assert_eq!(h.tokens().load()?, None);
    Ok(())
}

#[tokio::test]
async fn logout_invalidates_remotely_and_is_idempotent() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;
    portal.login(&staff("treasurer", "finance123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    assert_eq!(h.state.active_sessions().await, 1);

    portal.logout().await;
    assert!(!portal.session().is_authenticated());
    assert_eq!(h.state.active_sessions().await, 0);
    assert_eq!(h.tokens().load()?, None);

    portal.logout().await;
    assert!(!portal.session().is_authenticated());
    assert!(matches!(portal.api().get_json("/profile").await, Err(ApiError::NotAuthenticated)));
    Ok(())
}

#[tokio::test]
async fn password_recovery_flow() -> Result<()> {
    let h = Harness::start().await?;
    let portal = h.portal()?;
    let email = "student@campus.example";

    portal.api().request_recovery_token(email).await?;
    let code = h.state.recovery_code(email).await.expect("code issued");
    assert!(!portal.api().validate_recovery_token(email, "000000x").await?);
    assert!(portal.api().validate_recovery_token(email, &code).await?);

    portal.api().reset_password(email, &code, "a-new-password").await?;
    assert!(matches!(portal.login(&student("2021-00001", "student123")).await, Err(AuthError::InvalidCredentials(_))));
    portal.login(&student("2021-00001", "a-new-password")).await.map_err(|e| anyhow::anyhow!("{}", e))?;

    // unknown emails get the same answer and no code
    portal.api().request_recovery_token("nobody@campus.example").await?;
    assert_eq!(h.state.recovery_code("nobody@campus.example").await, None);
    Ok(())
}

#[tokio::test]
async fn provider_verify_reports_identity() -> Result<()> {
    let h = Harness::start().await?;
    let provider = Arc::new(HttpAuthProvider::new(&h.config.api_base_url, Duration::from_secs(5))?);
    let portal = Portal::with_parts(h.config.clone(), provider.clone(), Arc::new(h.tokens()))?;
    portal.login(&staff("secretary", "general123")).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    let token = portal.session().token().expect("token");

    use campus_portal::identity::AuthProvider;
    let id = provider.verify(&token).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    assert_eq!(id.position(), Some(Position::General));
    assert!(matches!(provider.verify("a.b.c").await, Err(AuthError::InvalidCredentials(_))));
    Ok(())
}
