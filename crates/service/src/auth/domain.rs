use serde::{Deserialize, Serialize};

use models::profile::{UserProfile, ADMIN_ROLE};
use models::validation::{validate_email, validate_name};

use super::errors::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        Ok(())
    }
}

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_name("user", &self.name)?;
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!("password too short (>={MIN_PASSWORD_LEN})")));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials { Credentials::new(self.email.clone(), self.password.clone()) }
}

/// Signed-in identity: the account merged with its profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<String>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool { self.role.as_deref() == Some(ADMIN_ROLE) }

    pub(crate) fn from_profile(id: String, profile: UserProfile) -> Self {
        Self { id, email: profile.email, name: profile.name, role: profile.role }
    }
}

/// What a view requires of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Login and registration pages.
    GuestOnly,
    Authenticated,
    Admin,
}

pub const LOGIN_PATH: &str = "/auth/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";
pub const HOME_PATH: &str = "/";

/// Routing decision for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Render the view. `None` for guests on guest-only views.
    Granted(Option<CurrentUser>),
    RedirectToLogin { path: &'static str },
    RedirectHome,
}

impl Access {
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            Access::Granted(_) => None,
            Access::RedirectToLogin { path } => Some(*path),
            Access::RedirectHome => Some(HOME_PATH),
        }
    }

    /// Decide access for `user` at `level`.
    pub fn decide(level: AccessLevel, user: Option<CurrentUser>) -> Self {
        match (level, user) {
            (AccessLevel::GuestOnly, None) => Access::Granted(None),
            (AccessLevel::GuestOnly, Some(_)) => Access::RedirectHome,
            (AccessLevel::Authenticated, None) => Access::RedirectToLogin { path: LOGIN_PATH },
            (AccessLevel::Authenticated, Some(u)) => Access::Granted(Some(u)),
            (AccessLevel::Admin, None) => Access::RedirectToLogin { path: ADMIN_LOGIN_PATH },
            (AccessLevel::Admin, Some(u)) if u.is_admin() => Access::Granted(Some(u)),
            (AccessLevel::Admin, Some(_)) => Access::RedirectHome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<&str>) -> CurrentUser {
        CurrentUser { id: "u1".into(), email: "a@b.in".into(), name: "A".into(), role: role.map(str::to_string) }
    }

    #[test]
    fn admin_views_redirect_by_state() {
        assert_eq!(Access::decide(AccessLevel::Admin, None).redirect_path(), Some("/admin/login"));
        assert_eq!(Access::decide(AccessLevel::Admin, Some(user(None))), Access::RedirectHome);
        assert!(matches!(Access::decide(AccessLevel::Admin, Some(user(Some("admin")))), Access::Granted(Some(_))));
    }

    #[test]
    fn guest_views_bounce_signed_in_users() {
        assert_eq!(Access::decide(AccessLevel::GuestOnly, None), Access::Granted(None));
        assert_eq!(Access::decide(AccessLevel::GuestOnly, Some(user(None))).redirect_path(), Some("/"));
        assert_eq!(Access::decide(AccessLevel::Authenticated, None).redirect_path(), Some("/auth/login"));
    }

    #[test]
    fn registration_checks_run_locally() {
        let input = RegisterInput { name: "Asha".into(), email: "asha@grocer.in".into(), password: "short".into() };
        assert!(matches!(input.validate(), Err(AuthError::Validation(_))));
        assert!(Credentials::new("nobody", "pw").validate().is_err());
        assert_eq!(AuthError::Validation("x".into()).code(), 1001);
    }
}
