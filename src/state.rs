use crate::auth::{
    password::{Argon2Hasher, CredentialHasher},
    repo::{InMemoryUserStore, PgUserStore, UserStore},
    slug::{RandomSuffix, SuffixSource},
};
use crate::config::AppConfig;
use crate::db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub suffixes: Arc<dyn SuffixSource>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and wires the production collaborators.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config).await?;
        db::migrate(&pool).await;

        let users = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        let argon2 = Argon2Hasher::new(config.password_hash_cost)?;
        tracing::info!(cost = argon2.cost(), "password hasher ready");
        let hasher = Arc::new(argon2) as Arc<dyn CredentialHasher>;

        Ok(Self {
            config,
            users,
            hasher,
            suffixes: Arc::new(RandomSuffix),
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        suffixes: Arc<dyn SuffixSource>,
    ) -> Self {
        Self {
            config,
            users,
            hasher,
            suffixes,
        }
    }

    /// State backed by an in-memory store, no database required.
    pub fn in_memory(store: InMemoryUserStore, hash_cost: u32) -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig {
            database_url: String::new(),
            max_connections: 1,
            password_hash_cost: hash_cost,
            host: "127.0.0.1".into(),
            port: 0,
        });
        let hasher = Arc::new(Argon2Hasher::new(hash_cost)?);
        Ok(Self::from_parts(
            config,
            Arc::new(store),
            hasher,
            Arc::new(RandomSuffix),
        ))
    }

    pub fn with_suffixes(mut self, suffixes: Arc<dyn SuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }
}
