//! Authentication: Argon2id password hashing, HS256 bearer tokens and roles.

mod password;
mod token;

pub use password::{hash_password, validate_password, verify_password, MIN_PASSWORD_LENGTH};
pub use token::{Claims, IssuedToken, TokenKeys};

use crate::error::{AppError, AuthError};
use serde::{Deserialize, Serialize};

/// Access role stored on each user and carried in its token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::Validation(format!(
                "invalid role: {} (expected customer or admin)",
                s
            ))),
        }
    }
}

/// Authenticated caller as carried in the token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        Ok(Caller {
            user_id: claims.user_id()?,
            role: claims.role,
        })
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
