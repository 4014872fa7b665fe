//! Generic single-row statement execution
//!
//! Statements come from the statement provider as text with positional
//! parameters; callers pass the values in order as [`SqlValue`]s.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres, Row};

/// A positional statement parameter.
///
/// Nullable variants bind a typed NULL so Postgres can still infer the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
}

impl SqlValue {
    /// Rendering used in error messages and logs.
    pub fn display(&self) -> String {
        match self {
            SqlValue::Int(Some(v)) => v.to_string(),
            SqlValue::Float(Some(v)) => v.to_string(),
            SqlValue::Text(Some(v)) => v.clone(),
            _ => "NULL".to_string(),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(Some(value))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        SqlValue::Int(value)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(value: Option<f64>) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(Some(value.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(Some(value))
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(Some(value.clone()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Option<&String>> for SqlValue {
    fn from(value: Option<&String>) -> Self {
        SqlValue::Text(value.cloned())
    }
}

/// Join key values for messages, e.g. `RAW` or `cmsRun/CMSSW_14/abc`.
pub fn display_key(values: &[SqlValue]) -> String {
    values
        .iter()
        .map(SqlValue::display)
        .collect::<Vec<_>>()
        .join("/")
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_deref()),
        };
    }
    query
}

/// Run a statement and return the number of affected rows.
pub async fn execute(
    conn: &mut PgConnection,
    sql: &str,
    values: &[SqlValue],
) -> Result<u64, sqlx::Error> {
    let result = bind_values(sqlx::query(sql), values).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Run a statement returning at most one row whose first column is an id.
pub async fn fetch_id(
    conn: &mut PgConnection,
    sql: &str,
    values: &[SqlValue],
) -> Result<Option<i64>, sqlx::Error> {
    let row = fetch_row(conn, sql, values).await?;
    row.map(|r| r.try_get::<i64, _>(0)).transpose()
}

/// Run a statement returning at most one row.
pub async fn fetch_row(
    conn: &mut PgConnection,
    sql: &str,
    values: &[SqlValue],
) -> Result<Option<PgRow>, sqlx::Error> {
    bind_values(sqlx::query(sql), values)
        .fetch_optional(conn)
        .await
}
