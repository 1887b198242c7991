use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A user record ready for insertion. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Customer => "CUSTOMER",
        }
    }
}

/// The caller of a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Customer(i64),
    Admin(i64),
}

impl Actor {
    pub fn from_user(user: &User) -> Self {
        if user.is_admin {
            Actor::Admin(user.id)
        } else {
            Actor::Customer(user.id)
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Actor::Anonymous => None,
            Actor::Customer(id) | Actor::Admin(id) => Some(*id),
        }
    }

    pub fn require_user(&self) -> CoreResult<i64> {
        self.user_id()
            .ok_or_else(|| CoreError::Unauthenticated("sign in to continue".to_string()))
    }

    /// The single admin gate. Everything under the admin surface takes the returned proof.
    pub fn require_admin(&self) -> CoreResult<AdminActor> {
        match self {
            Actor::Admin(id) => Ok(AdminActor(*id)),
            Actor::Customer(_) => Err(CoreError::Forbidden(
                "administrator privileges required".to_string(),
            )),
            Actor::Anonymous => Err(CoreError::Unauthenticated("sign in to continue".to_string())),
        }
    }

    /// Owners and admins may see or change a user's data; nobody else.
    pub fn can_access(&self, owner_id: i64) -> bool {
        match self {
            Actor::Admin(_) => true,
            Actor::Customer(id) => *id == owner_id,
            Actor::Anonymous => false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Actor::Anonymous => None,
            Actor::Customer(_) => Some(Role::Customer),
            Actor::Admin(_) => Some(Role::Admin),
        }
    }
}

/// Proof that the admin gate was passed. Only `Actor::require_admin` constructs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminActor(i64);

impl AdminActor {
    pub fn user_id(&self) -> i64 {
        self.0
    }
}
