use crate::db::Db;
use crate::error::DocragError;

/// Name of the vector store table. Its existence in the catalog is the
/// sole persisted "index has been built" signal; there is no separate
/// manifest or version marker.
pub const VECTOR_TABLE: &str = "data_vector_store";

/// Outcome of the vector-table existence probe.
///
/// `CheckFailed` records that the catalog query itself failed (connection
/// error, permissions) and the pipeline fell back to assuming the index is
/// absent. Keeping the variant distinct from `NotExists` lets callers and
/// tests see which branch fired, while `assume_built` preserves the
/// rebuild-over-crash behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorsCheck {
    Exists,
    NotExists,
    CheckFailed,
}

impl VectorsCheck {
    /// True only when the table is known to exist. `CheckFailed`
    /// deliberately maps to false: a rebuild is cheaper than a crash.
    pub fn assume_built(self) -> bool {
        matches!(self, VectorsCheck::Exists)
    }
}

/// Probe the catalog for the vector store table.
///
/// Never returns an error: any query failure is logged and reported as
/// [`VectorsCheck::CheckFailed`].
pub async fn vectors_exist(db: &Db) -> VectorsCheck {
    let result = db
        .with_connection(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [VECTOR_TABLE],
                |row| row.get(0),
            )?;
            Ok::<bool, DocragError>(exists)
        })
        .await;

    match result {
        Ok(true) => VectorsCheck::Exists,
        Ok(false) => VectorsCheck::NotExists,
        Err(e) => {
            log::warn!("Vector store existence check failed, assuming no vectors: {}", e);
            VectorsCheck::CheckFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fresh_database_has_no_vectors() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        assert_eq!(vectors_exist(&db).await, VectorsCheck::NotExists);
        assert!(!vectors_exist(&db).await.assume_built());
    }

    #[tokio::test]
    async fn test_exists_after_table_created() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        db.with_connection(|conn| {
            conn.execute(
                "CREATE TABLE data_vector_store (node_id TEXT PRIMARY KEY)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(vectors_exist(&db).await, VectorsCheck::Exists);
        assert!(vectors_exist(&db).await.assume_built());
    }

    #[tokio::test]
    async fn test_unrelated_table_does_not_count() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        db.with_connection(|conn| {
            conn.execute("CREATE TABLE other_table (id INTEGER)", [])?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(vectors_exist(&db).await, VectorsCheck::NotExists);
    }

    #[tokio::test]
    async fn test_check_failure_is_absorbed() {
        let temp_dir = TempDir::new().unwrap();
        // A directory is not a valid database file, so the query errors.
        // The probe must absorb that and report CheckFailed, never Err.
        let db = Db::new(temp_dir.path());

        let check = vectors_exist(&db).await;
        assert_eq!(check, VectorsCheck::CheckFailed);
        assert!(!check.assume_built());
    }
}
