//! Shared application state for route handlers.

use std::sync::Arc;

use cv_core::config::Config;
use cv_core::{Error, Result};
use cv_db::pool::DbPool;
use cv_storage::ByteStore;
use cv_vault::{IdGenerator, RandomIds, SqliteMetadataStore, Vault};

/// State handed to every handler via Axum `State`. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    /// Upload and chunk retrieval core.
    pub vault: Vault,
    /// Pool for the transaction queries the core does not cover.
    pub db: DbPool,
    pub config: Arc<Config>,
}

impl AppContext {
    /// Build a context over an existing pool and byte store.
    pub fn new(config: Config, db: DbPool, bytes: Arc<dyn ByteStore>) -> Self {
        Self::with_ids(config, db, bytes, Arc::new(RandomIds))
    }

    /// Like [`AppContext::new`] with a custom identifier source.
    pub fn with_ids(
        config: Config,
        db: DbPool,
        bytes: Arc<dyn ByteStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let metadata = Arc::new(SqliteMetadataStore::new(db.clone()));
        Self {
            vault: Vault::new(metadata, bytes, ids),
            db,
            config: Arc::new(config),
        }
    }

    /// Run `f` against a pooled connection on the blocking thread pool.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = cv_db::pool::get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }

    /// Open the database and byte store described by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let db_path = &config.server.db_path;
        let existed = db_path.exists();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                tracing::info!("Created database directory {}", parent.display());
            }
        }

        let db_str = db_path
            .to_str()
            .ok_or_else(|| Error::Validation(format!("db_path {} is not UTF-8", db_path.display())))?;
        let db = cv_db::pool::init_pool(db_str)?;
        if existed {
            tracing::info!("Database opened (existing) at {db_str}");
        } else {
            tracing::info!("Database created (new) at {db_str}");
        }

        let bytes = cv_storage::open(&config.storage).await?;
        Ok(Self::new(config, db, bytes))
    }
}
