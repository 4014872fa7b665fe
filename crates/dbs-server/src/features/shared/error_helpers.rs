//! Database error handling utilities
//!
//! Helpers for classifying constraint violations reported by Postgres.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dbs_server::features::shared::error_helpers::is_unique_violation;
//!
//! match execute(&mut tx, &insert, &values).await {
//!     Err(e) if is_unique_violation(&e) => { /* created concurrently, re-query */ }
//!     other => { /* ... */ }
//! }
//! ```

use sqlx::Error as SqlxError;

/// Kind of constraint a statement tripped over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
    Check,
}

/// Classify a database error, or `None` if it is not a constraint violation.
pub fn constraint_violation(error: &SqlxError) -> Option<ConstraintViolation> {
    let SqlxError::Database(db_err) = error else {
        return None;
    };
    if db_err.is_unique_violation() {
        Some(ConstraintViolation::Unique)
    } else if db_err.is_foreign_key_violation() {
        Some(ConstraintViolation::ForeignKey)
    } else if db_err.is_check_violation() {
        Some(ConstraintViolation::Check)
    } else {
        None
    }
}

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    constraint_violation(error) == Some(ConstraintViolation::Unique)
}

/// Name of the violated constraint, when Postgres reports one.
pub fn violated_constraint(error: &SqlxError) -> Option<&str> {
    match error {
        SqlxError::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_violations() {
        let err = SqlxError::RowNotFound;
        assert_eq!(constraint_violation(&err), None);
        assert!(!is_unique_violation(&err));
        assert_eq!(violated_constraint(&err), None);
    }

    #[sqlx::test]
    async fn test_classifies_unique_and_check(pool: sqlx::PgPool) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO data_tiers (data_tier_id, data_tier_name) VALUES (1, 'RAW')")
            .execute(&pool)
            .await?;

        let dup = sqlx::query("INSERT INTO data_tiers (data_tier_id, data_tier_name) VALUES (2, 'RAW')")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&dup));
        assert_eq!(violated_constraint(&dup), Some("uq_data_tiers"));

        let orphan = sqlx::query(
            "INSERT INTO primary_datasets (primary_ds_id, primary_ds_name, primary_ds_type_id) \
             VALUES (1, 'Orphan', 999)",
        )
        .execute(&pool)
        .await
        .unwrap_err();
        assert_eq!(constraint_violation(&orphan), Some(ConstraintViolation::ForeignKey));

        Ok(())
    }
}
