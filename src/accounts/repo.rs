use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::accounts::repo_types::{UniqueField, User};

const EMAIL_CONSTRAINT: &str = "users_email_key";
const TOKEN_CONSTRAINT: &str = "users_verification_token_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0:?}")]
    Conflict(UniqueField),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Storage for user records. Uniqueness of email and verification token is
/// enforced here, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    /// Writes the record as-is. Never hashes anything.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => return StoreError::Conflict(UniqueField::Email),
                Some(TOKEN_CONSTRAINT) => {
                    return StoreError::Conflict(UniqueField::VerificationToken)
                }
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, is_verified, verification_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, is_verified, verification_token, created_at
            FROM users
            WHERE verification_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, full_name, email, password_hash, is_verified, verification_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, email = $3, password_hash = $4,
                is_verified = $5, verification_token = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .execute(&self.db)
        .await
        .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION: &str = include_str!("../../migrations/20240101000000_create_users.sql");

    #[test]
    fn constraint_names_match_migration() {
        assert!(MIGRATION.contains(&format!("CONSTRAINT {EMAIL_CONSTRAINT} UNIQUE (email)")));
        assert!(MIGRATION.contains(&format!(
            "CONSTRAINT {TOKEN_CONSTRAINT} UNIQUE (verification_token)"
        )));
    }

    #[test]
    fn non_database_errors_stay_database_errors() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-process store with the same uniqueness rules as the `users` table.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        fn conflict(users: &[User], user: &User) -> Option<UniqueField> {
            let others = users.iter().filter(|u| u.id != user.id);
            for other in others {
                if other.email == user.email {
                    return Some(UniqueField::Email);
                }
                if other.verification_token.is_some()
                    && other.verification_token == user.verification_token
                {
                    return Some(UniqueField::VerificationToken);
                }
            }
            None
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.verification_token.as_deref() == Some(token))
                .cloned())
        }

        async fn insert(&self, user: &User) -> Result<(), StoreError> {
            let mut users = self.users.lock().unwrap();
            if let Some(field) = Self::conflict(&users, user) {
                return Err(StoreError::Conflict(field));
            }
            users.push(user.clone());
            Ok(())
        }

        async fn save(&self, user: &User) -> Result<(), StoreError> {
            let mut users = self.users.lock().unwrap();
            if let Some(field) = Self::conflict(&users, user) {
                return Err(StoreError::Conflict(field));
            }
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(slot) => *slot = user.clone(),
                None => return Err(StoreError::Database(sqlx::Error::RowNotFound)),
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_token() {
        let store = MemoryUserStore::default();
        let first = User::new("Ann", "ann@x.com", "longenough", "tok-1".into()).unwrap();
        store.insert(&first).await.unwrap();

        let same_email = User::new("Bob", "ANN@x.com", "longenough", "tok-2".into()).unwrap();
        assert!(matches!(
            store.insert(&same_email).await,
            Err(StoreError::Conflict(UniqueField::Email))
        ));

        let same_token = User::new("Cid", "cid@x.com", "longenough", "tok-1".into()).unwrap();
        assert!(matches!(
            store.insert(&same_token).await,
            Err(StoreError::Conflict(UniqueField::VerificationToken))
        ));
    }

    #[tokio::test]
    async fn cleared_tokens_do_not_collide() {
        let store = MemoryUserStore::default();
        for (name, email) in [("Ann", "ann@x.com"), ("Bob", "bob@x.com")] {
            let mut user = User::new(name, email, "longenough", format!("tok-{name}")).unwrap();
            store.insert(&user).await.unwrap();
            user.mark_verified();
            store.save(&user).await.unwrap();
        }
        assert!(store.find_by_token("tok-Ann").await.unwrap().is_none());
        let ann = store.find_by_email("ann@x.com").await.unwrap().unwrap();
        assert!(ann.is_verified);
    }
}
