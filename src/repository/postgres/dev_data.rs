use sqlx::PgPool;

use crate::repository::errors::{RepositoryError, map_db_error};

/// Empties every table in one transaction, children first.
#[tracing::instrument(skip(pool))]
pub async fn purge(pool: &PgPool) -> Result<u64, RepositoryError> {
    let mut tx = pool.begin().await.map_err(map_db_error)?;
    let mut removed = 0;

    for table in ["bookings", "reviews", "tours", "users"] {
        let result = sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tracing::debug!(table, rows = result.rows_affected(), "table emptied");
        removed += result.rows_affected();
    }

    tx.commit().await.map_err(map_db_error)?;
    Ok(removed)
}
