//! Which screens a role may open, evaluated once per navigation request.

use serde::Serialize;

use crate::auth::Role;

/// Reachable without signing in. A signed-in user is sent home instead.
pub const PUBLIC_PATHS: [&str; 4] = ["/signin", "/signup", "/forgot-password", "/reset-password"];

const DONOR_RESTRICTED: [&str; 7] = [
    "/adminDashboard",
    "/admin-appointment",
    "/admin-blood-inventory",
    "/admin-user-management",
    "/admin-report",
    "/record-donation",
    "/work-schedule",
];

const DOCTOR_RESTRICTED: [&str; 1] = ["/admin-user-management"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum NavDecision {
    Allow,
    Redirect { to: String, clear_credential: bool },
}

impl NavDecision {
    fn redirect(to: impl Into<String>) -> Self {
        NavDecision::Redirect {
            to: to.into(),
            clear_credential: false,
        }
    }
}

/// What the request carried, already decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Missing,
    Invalid,
    Valid(Role),
}

fn under_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

/// Role table only: `(role, path) -> allow | redirect`.
pub fn gate(role: Role, path: &str) -> NavDecision {
    match role {
        Role::Donor if under_any(path, &DONOR_RESTRICTED) => NavDecision::redirect("/"),
        Role::Doctor if under_any(path, &DOCTOR_RESTRICTED) => {
            NavDecision::redirect("/adminDashboard")
        }
        Role::Admin | Role::Doctor | Role::Donor => NavDecision::Allow,
    }
}

/// Full request-time rule, including public screens and missing or broken
/// credentials.
pub fn evaluate(credential: Credential, path: &str) -> NavDecision {
    let public = under_any(path, &PUBLIC_PATHS);
    match credential {
        Credential::Missing if path == "/" || public => NavDecision::Allow,
        Credential::Missing => NavDecision::redirect(format!(
            "/signin?from={}",
            urlencoding::encode(path)
        )),
        Credential::Invalid => NavDecision::Redirect {
            to: "/signin".to_string(),
            clear_credential: true,
        },
        Credential::Valid(_) if public => NavDecision::redirect("/"),
        Credential::Valid(role) => gate(role, path),
    }
}

/// Landing screen right after sign-in.
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Admin => "/adminDashboard",
        Role::Doctor | Role::Donor => "/",
    }
}
