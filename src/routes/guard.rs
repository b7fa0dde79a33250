use std::sync::Arc;

use tracing::debug;

use super::catalog::{requirement_for, RouteRequirement};
use super::permissions::{can_access_route, get_admin_home_route};
use crate::identity::{Identity, SessionStore};

pub const LOGIN_ROUTE: &str = "/login";
pub const STUDENT_HOME_ROUTE: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToRoleHome(String),
}

impl RouteDecision {
    /// Where navigation should end up; None means stay on the requested path.
    pub fn target(&self) -> Option<&str> {
        match self {
            RouteDecision::Allow => None,
            RouteDecision::RedirectToLogin => Some(LOGIN_ROUTE),
            RouteDecision::RedirectToRoleHome(p) => Some(p.as_str()),
        }
    }
}

/// Landing page after login, and the place a mismatched role is sent back to.
pub fn home_route_for(identity: &Identity) -> &'static str {
    match identity {
        Identity::Student { .. } => STUDENT_HOME_ROUTE,
        Identity::Admin { position, .. } => get_admin_home_route(*position),
    }
}

/// The guard's decision table, independent of any session store.
pub fn decide(identity: Option<&Identity>, requirement: RouteRequirement, path: &str) -> RouteDecision {
    if requirement == RouteRequirement::Public {
        return RouteDecision::Allow;
    }
    let Some(identity) = identity else {
        return RouteDecision::RedirectToLogin;
    };
    match (requirement, identity) {
        (RouteRequirement::Admin, Identity::Student { .. }) => RouteDecision::RedirectToRoleHome(STUDENT_HOME_ROUTE.to_string()),
        (RouteRequirement::Student, Identity::Admin { position, .. }) => {
            RouteDecision::RedirectToRoleHome(get_admin_home_route(*position).to_string())
        }
        (RouteRequirement::Admin, Identity::Admin { position, .. }) => {
            if can_access_route(path, Some(*position)) {
                RouteDecision::Allow
            } else {
                RouteDecision::RedirectToRoleHome(get_admin_home_route(*position).to_string())
            }
        }
        _ => RouteDecision::Allow,
    }
}

/// Evaluated on every protected navigation; holds no state between calls.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self { Self { session } }

    pub fn check(&self, path: &str) -> RouteDecision {
        let identity = self.session.current_identity();
        let requirement = requirement_for(path);
        let decision = decide(identity.as_ref(), requirement, path);
        if decision != RouteDecision::Allow {
            debug!(target: "guard", path, ?requirement, ?decision, "navigation redirected");
        }
        decision
    }
}
