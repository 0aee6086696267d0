use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, DocragError};

pub mod probe;
pub mod claim;

pub use probe::{vectors_exist, VectorsCheck};

/// Database connection wrapper
///
/// Holds only the path; each operation opens its own connection inside a
/// blocking task. Cheap to clone, so index handles can carry one.
#[derive(Clone)]
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

    /// Open a new database connection with optimized pragmas
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(DocragError::Database)?;

        // WAL for concurrency, NORMAL sync for speed, temp tables in memory
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY;"
        )?;

        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)
                .map_err(DocragError::Database)?;

            // Same pragmas as open_connection
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
            DocragError::Database(rusqlite::Error::InvalidParameterCount(0, 0))
        })?
    }

    /// Startup connectivity check. Opens a connection and runs a trivial
    /// query; any failure is returned to the caller (fatal at startup).
    pub async fn ping(&self) -> Result<()> {
        self.with_connection(|conn| {
            let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
            if one != 1 {
                return Err(DocragError::Store("connectivity probe returned garbage".to_string()));
            }
            Ok(())
        })
        .await
    }
}
