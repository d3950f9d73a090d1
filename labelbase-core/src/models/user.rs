/// User account record
///
/// Users carry exactly one system role at a time; project- and
/// dataset-scoped roles are granted separately through memberships.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE system_role AS ENUM ('user', 'admin', 'researcher');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     system_role system_role NOT NULL DEFAULT 'user',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::SystemRole;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Login name, unique across the system
    pub username: String,

    /// Email address, unique across the system
    pub email: String,

    /// Argon2id PHC-format hash; never the plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// System-wide role
    pub system_role: SystemRole,

    /// Deactivated accounts keep their records but cannot authenticate
    pub active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when the account holds the administrator role
    pub fn is_admin(&self) -> bool {
        self.system_role.is_admin()
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Pre-hashed password (hashing happens at the API edge)
    pub password_hash: String,

    /// Initial system role (defaults to the regular user role)
    #[serde(default = "default_system_role")]
    pub system_role: SystemRole,
}

fn default_system_role() -> SystemRole {
    SystemRole::User
}

/// Input for updating a user; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New login name
    pub username: Option<String>,

    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New system role
    pub system_role: Option<SystemRole>,

    /// Activate or deactivate the account
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: SystemRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            system_role: role,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(sample_user(SystemRole::Admin).is_admin());
        assert!(!sample_user(SystemRole::Researcher).is_admin());
        assert!(!sample_user(SystemRole::User).is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = sample_user(SystemRole::User);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"username\":\"ada\""));
    }

    #[test]
    fn test_create_user_default_role() {
        let input: CreateUser = serde_json::from_str(
            r#"{"username":"ada","email":"ada@example.com","password_hash":"h"}"#,
        )
        .unwrap();
        assert_eq!(input.system_role, SystemRole::User);
    }
}
