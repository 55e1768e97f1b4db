use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

/// Column guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Slug,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => write!(f, "email"),
            UniqueField::Slug => write!(f, "slug"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already taken")]
    Duplicate(UniqueField),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for user records. Implementations must enforce uniqueness of
/// `email` and `slug` atomically on `create`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by (normalised) email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by slug.
    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<User>>;

    /// Insert a user and return the stored row.
    async fn create(&self, new_user: NewUser) -> StoreResult<User>;
}

const USER_COLUMNS: &str = "id, email, password_hash, name, slug, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_by(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        Ok(user)
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_email_key") => return StoreError::Duplicate(UniqueField::Email),
                Some("users_slug_key") => return StoreError::Duplicate(UniqueField::Slug),
                _ => {}
            }
        }
    }
    StoreError::Backend(err.into())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_by("email", email).await
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<User>> {
        self.find_by("slug", slug).await
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, name, slug) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.name)
            .bind(&new_user.slug)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)?;
        Ok(user)
    }
}

/// In-memory store for local runs and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.slug == slug).cloned())
    }

    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if users.values().any(|u| u.slug == new_user.slug) {
            return Err(StoreError::Duplicate(UniqueField::Slug));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            slug: new_user.slug,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());

        tracing::debug!(user_id = %user.id, "stored user in memory");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, slug: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test User".to_string(),
            slug: slug.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_email_and_slug() {
        let store = InMemoryUserStore::new();
        let created = store.create(new_user("a@x.com", "ann-lee")).await.unwrap();

        let by_email = store.find_by_email("a@x.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));

        let by_slug = store.find_by_slug("ann-lee").await.unwrap();
        assert_eq!(by_slug.map(|u| u.id), Some(created.id));

        assert!(store.find_by_slug("someone-else").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@x.com", "one")).await.unwrap();

        let err = store.create(new_user("a@x.com", "two")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@x.com", "ann-lee")).await.unwrap();

        let err = store.create(new_user("b@x.com", "ann-lee")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Slug)));
        assert_eq!(err.to_string(), "slug already taken");
    }

    /// Database error as reported by Postgres for a violated constraint.
    #[derive(Debug)]
    struct ConstraintViolation {
        unique: bool,
        constraint: Option<&'static str>,
    }

    impl std::fmt::Display for ConstraintViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "constraint violated: {:?}", self.constraint)
        }
    }

    impl std::error::Error for ConstraintViolation {}

    impl sqlx::error::DatabaseError for ConstraintViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::NotNullViolation
            }
        }
    }

    fn db_error(unique: bool, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintViolation { unique, constraint }))
    }

    #[test]
    fn unique_violations_map_to_their_column() {
        let err = map_insert_error(db_error(true, Some("users_email_key")));
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));

        let err = map_insert_error(db_error(true, Some("users_slug_key")));
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Slug)));
    }

    #[test]
    fn other_database_errors_stay_backend() {
        let unknown = map_insert_error(db_error(true, Some("users_pkey")));
        assert!(matches!(unknown, StoreError::Backend(_)));

        let unnamed = map_insert_error(db_error(true, None));
        assert!(matches!(unnamed, StoreError::Backend(_)));

        let not_unique = map_insert_error(db_error(false, Some("users_email_key")));
        assert!(matches!(not_unique, StoreError::Backend(_)));

        assert!(matches!(map_insert_error(sqlx::Error::PoolTimedOut), StoreError::Backend(_)));
    }
}
