use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::{roles, User};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub address: Option<&'a str>,
}

pub struct ProfileChanges<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub address: Option<&'a str>,
}

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AppError::Internal)
    }

    pub fn verify_password(hash: &str, password: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub async fn register(db: &Pool<Postgres>, new_user: NewUser<'_>) -> AppResult<User> {
        if new_user.username.trim().is_empty() || new_user.email.trim().is_empty() {
            return Err(AppError::BadRequest("username and email are required".into()));
        }
        if new_user.password.len() < 8 {
            return Err(AppError::BadRequest(
                "password must be at least 8 characters".into(),
            ));
        }
        if !roles::is_valid(new_user.role) || new_user.role == roles::ADMIN {
            return Err(AppError::BadRequest(
                "role must be customer or provider".into(),
            ));
        }

        let password_hash = Self::hash_password(new_user.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role, phone_number, address)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(&password_hash)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.role)
        .bind(new_user.phone_number)
        .bind(new_user.address)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                AppError::Conflict("username or email already taken".into())
            }
            _ => AppError::Database(e),
        })?;

        Ok(user)
    }

    pub async fn authenticate(
        db: &Pool<Postgres>,
        username: &str,
        password: &str,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !Self::verify_password(&user.password_hash, password) {
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn get_user(db: &Pool<Postgres>, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_profile(
        db: &Pool<Postgres>,
        user_id: Uuid,
        changes: ProfileChanges<'_>,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                 first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 phone_number = COALESCE($4, phone_number),
                 address = COALESCE($5, address),
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(user_id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.phone_number)
        .bind(changes.address)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = AuthService::hash_password("correct horse battery").unwrap();
        assert!(AuthService::verify_password(&hash, "correct horse battery"));
        assert!(!AuthService::verify_password(&hash, "wrong password"));
    }

    #[test]
    fn verify_handles_garbage_hashes() {
        assert!(!AuthService::verify_password("not-a-phc-string", "anything"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = AuthService::hash_password("same input").unwrap();
        let b = AuthService::hash_password("same input").unwrap();
        assert_ne!(a, b);
    }
}
