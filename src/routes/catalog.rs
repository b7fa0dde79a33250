use super::permissions::{matches_prefix, normalize_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Public,
    Student,
    Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct Screen {
    pub path: &'static str,
    pub title: &'static str,
    pub requirement: RouteRequirement,
}

pub const ADMIN_ROOT: &str = "/admin";

pub const SCREENS: &[Screen] = &[
    Screen { path: "/", title: "Home", requirement: RouteRequirement::Public },
    Screen { path: "/about", title: "About", requirement: RouteRequirement::Public },
    Screen { path: "/events-public", title: "Upcoming events", requirement: RouteRequirement::Public },
    Screen { path: "/contact", title: "Contact", requirement: RouteRequirement::Public },
    Screen { path: "/login", title: "Log in", requirement: RouteRequirement::Public },
    Screen { path: "/forgot-password", title: "Forgot password", requirement: RouteRequirement::Public },
    Screen { path: "/reset-password", title: "Reset password", requirement: RouteRequirement::Public },
    Screen { path: "/dashboard", title: "Student dashboard", requirement: RouteRequirement::Student },
    Screen { path: "/bulletin", title: "Bulletin", requirement: RouteRequirement::Student },
    Screen { path: "/merch", title: "Merch store", requirement: RouteRequirement::Student },
    Screen { path: "/cart", title: "Cart", requirement: RouteRequirement::Student },
    Screen { path: "/events", title: "Events", requirement: RouteRequirement::Student },
    Screen { path: "/forum", title: "Forum", requirement: RouteRequirement::Student },
    Screen { path: "/profile", title: "Profile", requirement: RouteRequirement::Student },
    Screen { path: "/admin/dashboard", title: "Executive dashboard", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/students", title: "Students", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/staff", title: "Staff management", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/audit-logs", title: "Audit logs", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/finance", title: "Finance overview", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/sales", title: "Sales", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/orders", title: "Orders", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/products", title: "Products", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/inventory", title: "Inventory", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/events", title: "Event management", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/sessions", title: "Event sessions", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/attendance", title: "Attendance", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/announcements", title: "Announcements", requirement: RouteRequirement::Admin },
    Screen { path: "/admin/profile", title: "Admin profile", requirement: RouteRequirement::Admin },
];

/// Role requirement for any path, including ones not listed in `SCREENS`.
pub fn requirement_for(path: &str) -> RouteRequirement {
    let path = normalize_path(path);
    if matches_prefix(&path, ADMIN_ROOT) {
        return RouteRequirement::Admin;
    }
    SCREENS
        .iter()
        .filter(|s| s.requirement == RouteRequirement::Student)
        .find(|s| matches_prefix(&path, s.path))
        .map(|_| RouteRequirement::Student)
        .unwrap_or(RouteRequirement::Public)
}

pub fn screen_for(path: &str) -> Option<&'static Screen> {
    let path = normalize_path(path);
    SCREENS.iter().find(|s| s.path == path)
}
