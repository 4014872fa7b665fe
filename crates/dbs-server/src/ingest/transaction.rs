//! The block transaction shared by the orchestrator and file units.
//!
//! One pooled connection carries the whole block write. Units take the lock
//! per statement, so their work interleaves but never overlaps on the wire.

use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use super::error::{IngestError, IngestResult};

#[derive(Clone)]
pub struct BlockTransaction {
    inner: Arc<Mutex<Transaction<'static, Postgres>>>,
}

impl BlockTransaction {
    pub async fn begin(pool: &PgPool) -> IngestResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| IngestError::transaction("ingest.transaction.begin", e))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(tx)),
        })
    }

    /// Exclusive access to the transaction; deref twice for the connection.
    pub async fn lock(&self) -> MutexGuard<'_, Transaction<'static, Postgres>> {
        self.inner.lock().await
    }

    /// Commit. Fails if a unit still holds a handle to the transaction.
    pub async fn commit(self) -> IngestResult<()> {
        let tx = Arc::try_unwrap(self.inner).map_err(|shared| IngestError::Concurrency {
            function: "ingest.transaction.commit",
            failed: 0,
            total: Arc::strong_count(&shared) - 1,
            first_error: "transaction still held by running file units".to_string(),
        })?;
        tx.into_inner()
            .commit()
            .await
            .map_err(|e| IngestError::transaction("ingest.transaction.commit", e))
    }

    /// Roll back. If units still hold handles, the rollback happens when the
    /// last one drops the transaction.
    pub async fn rollback(self) {
        match Arc::try_unwrap(self.inner) {
            Ok(tx) => {
                if let Err(e) = tx.into_inner().rollback().await {
                    warn!(error = %e, "Block transaction rollback failed");
                }
            },
            Err(shared) => {
                warn!(
                    holders = Arc::strong_count(&shared) - 1,
                    "Block transaction still shared, deferring rollback to drop"
                );
            },
        }
    }
}
