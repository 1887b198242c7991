use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use voyage_core::identity::{NewUser, User};
use voyage_core::repository::UserRepository;
use voyage_core::{CoreError, CoreResult};
use voyage_shared::pii::Masked;

const MIN_PASSWORD_LEN: usize = 8;
// bcrypt only looks at the first 72 bytes.
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: Masked<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        let username = self.username.trim();
        if !(3..=64).contains(&username.chars().count()) {
            return Err(CoreError::ValidationFailed(
                "username must be between 3 and 64 characters".to_string(),
            ));
        }
        if !is_plausible_email(self.email.trim()) {
            return Err(CoreError::ValidationFailed("email address is not valid".to_string()));
        }
        let password = self.password.expose();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::ValidationFailed(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(CoreError::ValidationFailed(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        for (field, value, max) in [
            ("first_name", &self.first_name, 50),
            ("last_name", &self.last_name, 50),
            ("phone", &self.phone, 20),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().chars().count() > max) {
                return Err(CoreError::ValidationFailed(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Result of the operator's create-admin command.
#[derive(Debug, Clone)]
pub enum AdminOutcome {
    Created(User),
    AlreadyExists(User),
}

/// Registration, sign-in and the admin bootstrap.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    pub async fn register(&self, request: RegisterRequest) -> CoreResult<User> {
        request.validate()?;
        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: request.username.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                password_hash,
                first_name: trimmed(request.first_name),
                last_name: trimmed(request.last_name),
                phone: trimmed(request.phone),
                is_admin: false,
            })
            .await?;
        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn authenticate(&self, email: &str, password: &Masked<String>) -> CoreResult<User> {
        let rejected = || CoreError::Unauthenticated("invalid email or password".to_string());

        let user = match self.users.find_user_by_email(&email.trim().to_lowercase()).await? {
            Some(user) => user,
            None => return Err(rejected()),
        };
        if !verify_password(password.clone(), user.password_hash.clone()).await? {
            warn!("Failed sign-in for user {}", user.id);
            return Err(rejected());
        }
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> CoreResult<User> {
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    /// Creates an administrator unless one already exists.
    pub async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: Masked<String>,
    ) -> CoreResult<AdminOutcome> {
        if let Some(existing) = self.users.find_first_admin().await? {
            return Ok(AdminOutcome::AlreadyExists(existing));
        }

        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password,
            first_name: None,
            last_name: None,
            phone: None,
        };
        request.validate()?;
        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: request.username.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                password_hash,
                first_name: None,
                last_name: None,
                phone: None,
                is_admin: true,
            })
            .await?;
        info!("Created admin user {} ({})", user.id, user.username);
        Ok(AdminOutcome::Created(user))
    }

    /// Removes the first administrator, returning it if there was one.
    pub async fn delete_admin(&self) -> CoreResult<Option<User>> {
        let Some(admin) = self.users.find_first_admin().await? else {
            return Ok(None);
        };
        self.users.delete_user(admin.id).await?;
        info!("Deleted admin user {} ({})", admin.id, admin.username);
        Ok(Some(admin))
    }
}

async fn hash_password(password: Masked<String>, cost: u32) -> CoreResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password.expose(), cost))
        .await
        .map_err(|e| CoreError::Storage(format!("password hashing task failed: {}", e)))?
        .map_err(|e| CoreError::Storage(format!("password hashing failed: {}", e)))
}

async fn verify_password(password: Masked<String>, hash: String) -> CoreResult<bool> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password.expose(), &hash))
        .await
        .map_err(|e| CoreError::Storage(format!("password check task failed: {}", e)))?;
    // A malformed stored hash is treated as a mismatch.
    Ok(outcome.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_store::Repositories;

    fn service() -> AccountService {
        AccountService::new(Repositories::in_memory().users, 4)
    }

    fn register(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: Masked("correct horse".to_string()),
            first_name: Some("  Grace ".to_string()),
            last_name: None,
            phone: Some("".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let accounts = service();
        let user = accounts.register(register("grace", "Grace@Example.com")).await.unwrap();
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.first_name.as_deref(), Some("Grace"));
        assert_eq!(user.phone, None);
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "correct horse");

        let signed_in = accounts
            .authenticate("grace@example.com", &Masked("correct horse".to_string()))
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);
    }

    #[tokio::test]
    async fn test_bad_credentials_look_the_same() {
        let accounts = service();
        accounts.register(register("grace", "grace@example.com")).await.unwrap();

        let wrong = accounts
            .authenticate("grace@example.com", &Masked("wrong password".to_string()))
            .await
            .unwrap_err();
        let unknown = accounts
            .authenticate("nobody@example.com", &Masked("correct horse".to_string()))
            .await
            .unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, CoreError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let accounts = service();
        accounts.register(register("grace", "grace@example.com")).await.unwrap();
        let err = accounts.register(register("hopper", "GRACE@example.com")).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_register_validation() {
        assert!(register("gr", "grace@example.com").validate().is_err());
        assert!(register("grace", "not-an-email").validate().is_err());
        assert!(register("grace", "grace@localhost").validate().is_err());

        let mut short = register("grace", "grace@example.com");
        short.password = Masked("short".to_string());
        assert!(short.validate().is_err());
    }

    #[tokio::test]
    async fn test_admin_bootstrap_lifecycle() {
        let accounts = service();
        let created = accounts
            .ensure_admin("root", "root@example.com", Masked("administrator".to_string()))
            .await
            .unwrap();
        let admin = match created {
            AdminOutcome::Created(user) => user,
            AdminOutcome::AlreadyExists(_) => panic!("expected a new admin"),
        };
        assert!(admin.is_admin);

        let again = accounts
            .ensure_admin("other", "other@example.com", Masked("administrator".to_string()))
            .await
            .unwrap();
        assert!(matches!(again, AdminOutcome::AlreadyExists(ref u) if u.id == admin.id));

        let deleted = accounts.delete_admin().await.unwrap();
        assert_eq!(deleted.map(|u| u.id), Some(admin.id));
        assert!(accounts.delete_admin().await.unwrap().is_none());
    }
}
