use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, VinculosError};

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Execute a closure with a database connection in a blocking task
    ///
    /// WAL mode for better concurrency, NORMAL sync for speed, foreign keys
    /// for edge integrity. The engine only reads; writes happen in the seed
    /// command and migrations.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)
                .map_err(VinculosError::Storage)?;

            conn.execute_batch(
                "PRAGMA journal_mode = WAL; \
                 PRAGMA synchronous = NORMAL; \
                 PRAGMA foreign_keys = ON; \
                 PRAGMA temp_store = MEMORY;"
            )?;

            f(&mut conn)
        })
        .await
        .map_err(|_e| {
            VinculosError::Storage(rusqlite::Error::InvalidParameterCount(0, 0))
        })?
    }
}

pub mod migrate;
