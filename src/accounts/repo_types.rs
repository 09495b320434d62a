use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    password::{hash_password, verify_password},
    services::{is_valid_email, normalize_email},
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Field rules checked before a user reaches storage. The message is shown to the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Full name is required.")]
    MissingFullName,
    #[error("Email is required.")]
    MissingEmail,
    #[error("Password is required.")]
    MissingPassword,
    #[error("Password must be at least 8 characters long.")]
    PasswordTooShort,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never plaintext
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Validates a sign-up candidate and hashes its password.
    /// The result is unverified and carries `verification_token`.
    pub fn new(
        full_name: &str,
        email: &str,
        password: &str,
        verification_token: String,
    ) -> Result<Self, UserError> {
        let full_name = full_name.trim();
        let email = normalize_email(email);

        if full_name.is_empty() {
            return Err(ValidationError::MissingFullName.into());
        }
        if email.is_empty() {
            return Err(ValidationError::MissingEmail.into());
        }
        check_password(password)?;
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail.into());
        }

        let password_hash = hash_password(password).map_err(|e| UserError::Hash(e.to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email,
            password_hash,
            is_verified: false,
            verification_token: Some(verification_token),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Replaces the stored hash only when `plain` is not already the current password.
    /// Returns whether the hash changed.
    pub fn set_password(&mut self, plain: &str) -> Result<bool, UserError> {
        check_password(plain)?;
        let unchanged = verify_password(plain, &self.password_hash)
            .map_err(|e| UserError::Hash(e.to_string()))?;
        if unchanged {
            return Ok(false);
        }
        self.password_hash = hash_password(plain).map_err(|e| UserError::Hash(e.to_string()))?;
        Ok(true)
    }

    /// Consumes the verification token. The token is gone for good after this.
    pub fn mark_verified(&mut self) {
        self.is_verified = true;
        self.verification_token = None;
    }
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Column guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    VerificationToken,
}
