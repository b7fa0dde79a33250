//! Client-side route authorization: the permission table, the screen catalog,
//! and the guard that turns both plus the current session into a navigation decision.

mod permissions;
mod catalog;
mod guard;

pub use permissions::{
    access_level, can_access_route, get_admin_home_route, matches_prefix, normalize_path, Access, ADMIN_HOME_ROUTE,
    ALL_ADMIN_PREFIXES, EXECUTIVE_HOME_ROUTE, EXECUTIVE_ONLY_PREFIXES, FINANCE_PREFIXES,
};
pub use catalog::{requirement_for, screen_for, RouteRequirement, Screen, ADMIN_ROOT, SCREENS};
pub use guard::{decide, home_route_for, RouteDecision, RouteGuard, LOGIN_ROUTE, STUDENT_HOME_ROUTE};
