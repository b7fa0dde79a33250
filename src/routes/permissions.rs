//! Static route permission table for the admin back-office.
//!
//! Rule classes are checked in a fixed order rather than by longest prefix:
//! executive-only first, then finance and all-admin together as a union.
//! Everything outside these tables is open. Whether the identity is an admin at all
//! is decided by the route guard, not here.

use crate::identity::Position;

pub const EXECUTIVE_ONLY_PREFIXES: &[&str] = &[
    "/admin/dashboard",
    "/admin/students",
    "/admin/staff",
    "/admin/audit-logs",
];

/// Full access for EXECUTIVE and FINANCE.
pub const FINANCE_PREFIXES: &[&str] = &[
    "/admin/finance",
    "/admin/sales",
    "/admin/orders",
];

pub const ALL_ADMIN_PREFIXES: &[&str] = &[
    // finance overview doubles as the general admin landing page (read-only)
    "/admin/finance",
    "/admin/events",
    "/admin/sessions",
    "/admin/attendance",
    "/admin/products",
    "/admin/inventory",
    "/admin/announcements",
    "/admin/profile",
];

pub const EXECUTIVE_HOME_ROUTE: &str = "/admin/dashboard";
pub const ADMIN_HOME_ROUTE: &str = "/admin/finance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Denied,
    /// Visible, but the screen offers no edit affordances.
    ReadOnly,
    Full,
}

/// Canonical form used for matching: leading slash, no query or fragment,
/// no duplicate or trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    let mut out = String::with_capacity(end + 1);
    for seg in path[..end].split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() { out.push('/'); }
    out
}

/// `path` equals `prefix` or continues it at a segment boundary.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

fn matches_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| matches_prefix(path, p))
}

/// May an identity with this admin position (None for non-admins) view `path`?
pub fn can_access_route(path: &str, position: Option<Position>) -> bool {
    let path = normalize_path(path);
    if matches_any(&path, EXECUTIVE_ONLY_PREFIXES) {
        return position == Some(Position::Executive);
    }
    let finance = matches_any(&path, FINANCE_PREFIXES);
    let all_admin = matches_any(&path, ALL_ADMIN_PREFIXES);
    if finance || all_admin {
        return all_admin || matches!(position, Some(Position::Executive | Position::Finance));
    }
    true
}

pub fn access_level(path: &str, position: Option<Position>) -> Access {
    if !can_access_route(path, position) {
        return Access::Denied;
    }
    if position == Some(Position::General) && matches_any(&normalize_path(path), FINANCE_PREFIXES) {
        return Access::ReadOnly;
    }
    Access::Full
}

/// Redirect target and default landing page for an admin position.
pub fn get_admin_home_route(position: Position) -> &'static str {
    match position {
        Position::Executive => EXECUTIVE_HOME_ROUTE,
        Position::Finance | Position::General => ADMIN_HOME_ROUTE,
    }
}
