use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;
use crate::db::Db;
use crate::error::{DocragError, Result};

/// Guard for the single-row rebuild claim.
///
/// The existence check plus subsequent table build is a check-then-act
/// sequence; two processes could both observe "no vectors" and both start
/// building. Taking this claim first makes the second claimant fail fast
/// with [`DocragError::RebuildInProgress`] instead of double-writing.
///
/// The claim does not auto-expire. If a holder crashes mid-rebuild the row
/// stays behind and must be cleared manually (delete the row or the
/// database file) before the next rebuild, consistent with the pipeline's
/// no-partial-recovery stance.
pub struct RebuildClaim {
    db: Db,
    claimant: String,
}

impl RebuildClaim {
    /// Try to take the claim. Exactly one process can hold it at a time.
    pub async fn acquire(db: &Db) -> Result<Self> {
        let claimant = Uuid::new_v4().to_string();
        let claimant_row = claimant.clone();

        db.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "CREATE TABLE IF NOT EXISTS rebuild_claim (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    claimant TEXT NOT NULL,
                    claimed_at TEXT NOT NULL
                )",
                [],
            )?;
            // Fixed id makes the insert the atomic claim: a second
            // claimant violates the primary key and loses.
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO rebuild_claim (id, claimant, claimed_at) VALUES (1, ?1, ?2)",
                params![claimant_row, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;

            if inserted == 0 {
                return Err(DocragError::RebuildInProgress);
            }
            Ok(())
        })
        .await?;

        Ok(Self {
            db: db.clone(),
            claimant,
        })
    }

    /// Release the claim. Only removes the row this claimant wrote.
    pub async fn release(self) -> Result<()> {
        let claimant = self.claimant.clone();
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "DELETE FROM rebuild_claim WHERE id = 1 AND claimant = ?1",
                    params![claimant],
                )?;
                Ok(())
            })
            .await
    }
}
