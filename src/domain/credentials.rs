use serde::Serialize;

/// Username that may log in without a password length check.
pub const GUEST: &str = "guest";

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: Field,
    pub message: String,
}

/// Body of `POST /api/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            username: (!username.is_empty()).then_some(username),
            password: password.into(),
        }
    }

    /// A named, non-guest user needs a password of at least six characters.
    /// Anonymous (empty) and guest logins are not length checked.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        if let Some(user) = self.username.as_deref()
            && !user.is_empty()
            && user != GUEST
            && self.password.chars().count() < MIN_PASSWORD_LEN
        {
            violations.push(FieldViolation {
                field: Field::Password,
                message: format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn as_request(&self) -> LoginRequest<'_> {
        LoginRequest {
            username: self.username.as_deref().unwrap_or_default(),
            password: &self.password,
        }
    }
}
