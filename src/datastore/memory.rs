//! In-memory [`Datastore`] serving canned rows by query label.
//!
//! Used to exercise collectors without a database, the same way the
//! collectors' SQL would be answered by a real service schema.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{skip_undecodable, Datastore, DatastoreError, TenantQuery, TenantRow};

/// A [`Datastore`] answering queries from canned rows keyed by query label.
///
/// Queries with no rows configured return an empty result set; labels marked
/// with [`MemoryDatastore::fail`] return an error. Rows whose value count does
/// not match the query are skipped, like undecodable rows of a database. Every fetched query is
/// recorded and can be inspected with [`MemoryDatastore::executed`].
///
/// ```
/// # use openstack_usage_exporter::datastore::memory::MemoryDatastore;
/// # use openstack_usage_exporter::datastore::{Datastore, TenantQuery, TenantRow};
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = MemoryDatastore::default()
///     .with_rows("zones", vec![TenantRow::new("p1", vec![3.0])])
///     .fail("load_balancers");
///
/// let zones = TenantQuery::new("zones", "SELECT ...", 1);
/// assert_eq!(1, store.fetch(&zones).await.unwrap().len());
///
/// let lbs = TenantQuery::new("load_balancers", "SELECT ...", 1);
/// assert!(store.fetch(&lbs).await.is_err());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    tables: HashMap<&'static str, Vec<TenantRow>>,
    failing: HashSet<&'static str>,
    executed: Mutex<Vec<TenantQuery>>,
}

impl MemoryDatastore {
    /// Serve `rows` for the query labelled `label`.
    pub fn with_rows(mut self, label: &'static str, rows: Vec<TenantRow>) -> Self {
        self.tables.insert(label, rows);
        self
    }

    /// Make the query labelled `label` fail.
    pub fn fail(mut self, label: &'static str) -> Self {
        self.failing.insert(label);
        self
    }

    /// Queries fetched so far, in order.
    pub fn executed(&self) -> Vec<TenantQuery> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn fetch(&self, query: &TenantQuery) -> Result<Vec<TenantRow>, DatastoreError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(query.clone());
        }

        if self.failing.contains(query.label()) {
            return Err(DatastoreError::Query {
                query: query.label(),
                source: sqlx::Error::PoolTimedOut,
            });
        }

        let rows = self.tables.get(query.label()).cloned().unwrap_or_default();
        let checked = rows.into_iter().map(|row| {
            if row.values.len() == query.columns() {
                Ok(row)
            } else {
                Err(format!(
                    "row of `{}` has {} values, expected {}",
                    row.tenant,
                    row.values.len(),
                    query.columns()
                ))
            }
        });
        Ok(skip_undecodable("memory", query, checked))
    }
}
