use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use voyage_core::identity::{NewUser, User};
use voyage_core::repository::UserRepository;
use voyage_core::{CoreError, CoreResult};

use crate::sql::{is_foreign_key_violation, is_unique_violation, storage};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, phone, is_admin, created_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> CoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, phone, is_admin) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CoreError::Conflict("username or email is already registered".to_string())
                } else {
                    storage(e)
                }
            })?;
        user_from_row(&row).map_err(storage)
    }

    async fn find_user_by_id(&self, id: i64) -> CoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(user_from_row).transpose().map_err(storage)
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(user_from_row).transpose().map_err(storage)
    }

    async fn find_first_admin(&self) -> CoreResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE is_admin ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(user_from_row).transpose().map_err(storage)
    }

    async fn delete_user(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CoreError::Conflict(format!("user {} still has bookings", id))
                } else {
                    storage(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> CoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(count)
    }
}
