//! User accounts: registration, credential checks and role management.

use crate::auth::{hash_password, validate_password, verify_password, Role};
use crate::error::{AppError, AuthError};
use crate::store::table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Clone, Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

/// User as returned by the API (never carries the password hash).
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name shown on reviews when the author gives none.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.split('@').next().unwrap_or(&self.email).to_string()
        } else {
            full.to_string()
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            role: r.role.parse()?,
            created_at: r.created_at,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, created_at";

pub struct UserService;

impl UserService {
    /// Register a customer account. Duplicate email → 409.
    pub async fn register(pool: &PgPool, input: RegisterInput) -> Result<User, AppError> {
        validate_password(&input.password)?;
        let email = normalize_email(&input.email);
        let password = input.password;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|_| AuthError::PasswordHash)??;
        let sql = format!(
            "INSERT INTO {} (email, password_hash, first_name, last_name) VALUES ($1, $2, $3, $4) RETURNING {}",
            table("users"),
            COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&email)
            .bind(&hash)
            .bind(input.first_name.as_deref().map(str::trim).unwrap_or_default())
            .bind(input.last_name.as_deref().map(str::trim).unwrap_or_default())
            .fetch_one(pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict("a user with this email already exists".into())
                }
                _ => AppError::Db(e),
            })?;
        tracing::info!(user_id = row.id, "user registered");
        row.try_into()
    }

    /// Check email and password. Unknown email and wrong password are indistinguishable.
    pub async fn authenticate(pool: &PgPool, input: LoginInput) -> Result<User, AppError> {
        let email = normalize_email(&input.email);
        let sql = format!("SELECT {} FROM {} WHERE email = $1", COLUMNS, table("users"));
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&email)
            .fetch_optional(pool)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password = input.password;
        let hash = row.password_hash.clone();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|_| AuthError::PasswordHash)??;
        row.try_into()
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, table("users"));
        let row = sqlx::query_as::<_, UserRow>(&sql).bind(id).fetch_optional(pool).await?;
        row.map(User::try_from).transpose()
    }

    pub async fn set_role(pool: &PgPool, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE {} SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            table("users"),
            COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(pool)
            .await?;
        if row.is_some() {
            tracing::info!(user_id = id, role = %role, "user role changed");
        }
        row.map(User::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            email: "ada@example.com".into(),
            first_name: first.into(),
            last_name: last.into(),
            role: Role::Customer,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(user("Ada", "Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(user("Ada", "").display_name(), "Ada");
        assert_eq!(user("", "").display_name(), "ada");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn serialized_user_has_no_password_hash() {
        let json = serde_json::to_value(user("Ada", "Lovelace")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "customer");
    }
}
