//! Read-only access to the service databases.
//!
//! Collectors only ever issue aggregate queries returning one row per tenant:
//! the tenant id in the first column, followed by a fixed number of numeric
//! columns. [`Datastore`] is the seam between that contract and the actual
//! database; [`MySqlDatastore`] implements it on a `sqlx` connection pool.

use std::borrow::Cow;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use thiserror::Error;
use tracing::{debug, warn};

pub mod memory;

/// Opaque identifier of the project owning a resource.
pub type TenantId = String;

/// An aggregate query grouped by tenant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantQuery {
    label: &'static str,
    sql: Cow<'static, str>,
    binds: Vec<String>,
    columns: usize,
}

impl TenantQuery {
    /// Create a query returning `columns` value columns after the tenant id.
    ///
    /// `label` names the query in logs and identifies it to in-memory stores.
    pub fn new(label: &'static str, sql: impl Into<Cow<'static, str>>, columns: usize) -> Self {
        Self {
            label,
            sql: sql.into(),
            binds: Vec::new(),
            columns,
        }
    }

    /// Append a positional bind parameter.
    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.binds.push(value.into());
        self
    }

    /// The query label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Positional bind parameters.
    pub fn binds(&self) -> &[String] {
        &self.binds
    }

    /// Number of value columns following the tenant id.
    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// One result row: a tenant and its aggregate values.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantRow {
    /// The owning project.
    pub tenant: TenantId,
    /// One value per query column; `NULL` aggregates are `0.0`.
    pub values: Vec<f64>,
}

impl TenantRow {
    /// Convenience constructor.
    pub fn new(tenant: impl Into<TenantId>, values: Vec<f64>) -> Self {
        Self {
            tenant: tenant.into(),
            values,
        }
    }
}

/// Errors talking to a service database.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// The connection pool could not be established.
    #[error("failed to connect to database `{database}`: {source}")]
    Connect {
        /// Database name.
        database: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Executing the query or reading its result set failed.
    #[error("query `{query}` failed: {source}")]
    Query {
        /// Query label.
        query: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The result set does not have the expected number of columns.
    #[error("query `{query}` returned {actual} columns, expected {expected}")]
    Shape {
        /// Query label.
        query: &'static str,
        /// Expected column count, tenant id included.
        expected: usize,
        /// Actual column count.
        actual: usize,
    },
}

impl DatastoreError {
    /// Label of the failing query, if the error belongs to one.
    pub fn query(&self) -> Option<&'static str> {
        match self {
            DatastoreError::Connect { .. } => None,
            DatastoreError::Query { query, .. } | DatastoreError::Shape { query, .. } => Some(*query),
        }
    }
}

/// A read-only source of tenant-grouped aggregates.
#[async_trait]
pub trait Datastore: std::fmt::Debug + Send + Sync {
    /// Run the query and return its rows.
    ///
    /// Rows that cannot be decoded are skipped; a failure of the query or of
    /// the result set as a whole is an error.
    async fn fetch(&self, query: &TenantQuery) -> Result<Vec<TenantRow>, DatastoreError>;
}

/// [`Datastore`] backed by a MySQL connection pool.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone, Debug)]
pub struct MySqlDatastore {
    database: String,
    pool: MySqlPool,
}

impl MySqlDatastore {
    /// Connect to `dsn`, failing if the database is unreachable.
    pub async fn connect(
        dsn: &str,
        database: &str,
        max_connections: u32,
    ) -> Result<Self, DatastoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await
            .map_err(|source| DatastoreError::Connect {
                database: database.to_owned(),
                source,
            })?;
        debug!(%database, max_connections, "database pool ready");

        Ok(Self {
            database: database.to_owned(),
            pool,
        })
    }
}

#[async_trait]
impl Datastore for MySqlDatastore {
    async fn fetch(&self, query: &TenantQuery) -> Result<Vec<TenantRow>, DatastoreError> {
        let mut statement = sqlx::query(query.sql());
        for bind in query.binds() {
            statement = statement.bind(bind.as_str());
        }

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DatastoreError::Query {
                query: query.label(),
                source,
            })?;

        if let Some(row) = rows.first() {
            if row.len() != query.columns() + 1 {
                return Err(DatastoreError::Shape {
                    query: query.label(),
                    expected: query.columns() + 1,
                    actual: row.len(),
                });
            }
        }

        let decoded = rows.iter().map(|row| decode_row(row, query.columns()));
        Ok(skip_undecodable(&self.database, query, decoded))
    }
}

/// Keep the decodable rows, logging and dropping the others.
pub(crate) fn skip_undecodable<E: std::fmt::Display>(
    database: &str,
    query: &TenantQuery,
    rows: impl IntoIterator<Item = Result<TenantRow, E>>,
) -> Vec<TenantRow> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(error) => {
                warn!(
                    %database,
                    query = query.label(),
                    %error,
                    "skipping undecodable row"
                );
                None
            }
        })
        .collect()
}

fn decode_row(row: &MySqlRow, columns: usize) -> Result<TenantRow, sqlx::Error> {
    let tenant: String = row.try_get(0)?;
    let values = (1..=columns)
        .map(|index| {
            decode_aggregate(
                || row.try_get(index),
                || row.try_get(index),
                || row.try_get(index),
            )
            .map(Aggregate::value)
        })
        .collect::<Result<_, _>>()?;
    Ok(TenantRow { tenant, values })
}

/// A `COUNT`/`SUM` column as the driver hands it out.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Aggregate {
    Signed(Option<i64>),
    Unsigned(Option<u64>),
    Float(Option<f64>),
}

impl Aggregate {
    /// `NULL` is `0.0`.
    fn value(self) -> f64 {
        match self {
            Aggregate::Signed(v) => v.unwrap_or(0) as f64,
            Aggregate::Unsigned(v) => v.unwrap_or(0) as f64,
            Aggregate::Float(v) => v.unwrap_or(0.0),
        }
    }
}

/// Reads a column as `BIGINT`, then `BIGINT UNSIGNED`, then `DOUBLE`.
fn decode_aggregate<S, U, F>(signed: S, unsigned: U, float: F) -> Result<Aggregate, sqlx::Error>
where
    S: FnOnce() -> Result<Option<i64>, sqlx::Error>,
    U: FnOnce() -> Result<Option<u64>, sqlx::Error>,
    F: FnOnce() -> Result<Option<f64>, sqlx::Error>,
{
    if let Ok(value) = signed() {
        return Ok(Aggregate::Signed(value));
    }
    if let Ok(value) = unsigned() {
        return Ok(Aggregate::Unsigned(value));
    }
    float().map(Aggregate::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder() {
        let query = TenantQuery::new("routers", "SELECT project_id, COUNT(id) FROM routers WHERE x = ?", 1)
            .bind("ext-net");

        assert_eq!("routers", query.label());
        assert_eq!(1, query.columns());
        assert_eq!(&["ext-net".to_owned()], query.binds());
    }

    #[test]
    fn error_carries_query_label() {
        let error = DatastoreError::Query {
            query: "volumes",
            source: sqlx::Error::PoolTimedOut,
        };
        assert_eq!(Some("volumes"), error.query());
        assert!(error.to_string().starts_with("query `volumes` failed"));

        let error = DatastoreError::Shape {
            query: "zones",
            expected: 2,
            actual: 3,
        };
        assert_eq!("query `zones` returned 3 columns, expected 2", error.to_string());
    }

    fn mismatch<T>() -> Result<T, sqlx::Error> {
        Err(sqlx::Error::ColumnNotFound("mismatched type".to_owned()))
    }

    #[test]
    fn null_aggregate_is_zero() {
        let aggregate = decode_aggregate(|| Ok(None), mismatch, mismatch).unwrap();
        assert_eq!(Aggregate::Signed(None), aggregate);
        assert_eq!(0.0, aggregate.value());

        assert_eq!(0.0, Aggregate::Float(None).value());
    }

    #[test]
    fn unsigned_count_falls_back() {
        let aggregate = decode_aggregate(mismatch, || Ok(Some(12u64)), mismatch).unwrap();
        assert_eq!(Aggregate::Unsigned(Some(12)), aggregate);
        assert_eq!(12.0, aggregate.value());
    }

    #[test]
    fn float_is_last_resort() {
        let aggregate = decode_aggregate(mismatch, mismatch, || Ok(Some(1.5))).unwrap();
        assert_eq!(1.5, aggregate.value());

        assert!(decode_aggregate(mismatch, mismatch, mismatch::<Option<f64>>).is_err());
    }

    #[test]
    fn undecodable_rows_are_skipped() {
        let query = TenantQuery::new("volumes", "SELECT ...", 2);
        let rows = vec![
            Ok(TenantRow::new("p1", vec![2.0, 10.0])),
            mismatch(),
            Ok(TenantRow::new("p2", vec![12.0, 43.0])),
        ];

        let kept = skip_undecodable("cinder", &query, rows);
        assert_eq!(
            vec![
                TenantRow::new("p1", vec![2.0, 10.0]),
                TenantRow::new("p2", vec![12.0, 43.0]),
            ],
            kept
        );
    }
}
