//! Reconciliation of per-tenant aggregates across source tables.
//!
//! A collector's metrics are the columns of one [`UsageTable`]: one row per
//! tenant, one column per metric. Two strategies fill it:
//!
//! - [`Strategy::StoreJoin`]: a single query already returns every column,
//!   the database did the grouping (and any joining).
//! - [`Strategy::UnionMerge`]: independent queries each contribute some
//!   columns; the table's tenants are the union of all tenants seen and any
//!   column a tenant is missing from stays `0`.
//!
//! Either way a tenant known to exist in one table is reported for every
//! column, and a tenant appears at most once.

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use crate::datastore::{Datastore, DatastoreError, TenantId, TenantQuery, TenantRow};
use crate::metrics::gauge::Observation;
use crate::registry::Descriptor;

/// How a collector combines its source tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One query returning all columns.
    StoreJoin(TenantQuery),
    /// Several queries whose columns are concatenated in order.
    UnionMerge(Vec<TenantQuery>),
}

/// An aggregation plan: the strategy plus tenants to leave out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregation {
    strategy: Strategy,
    excluded: Vec<TenantId>,
}

impl Aggregation {
    /// Aggregate with a single store-side query.
    pub fn store_join(query: TenantQuery) -> Self {
        Self {
            strategy: Strategy::StoreJoin(query),
            excluded: Vec::new(),
        }
    }

    /// Aggregate by merging several queries on the union of their tenants.
    pub fn union_merge(queries: Vec<TenantQuery>) -> Self {
        Self {
            strategy: Strategy::UnionMerge(queries),
            excluded: Vec::new(),
        }
    }

    /// Never report `tenant`, whatever the store returns for it.
    pub fn excluding(mut self, tenant: impl Into<TenantId>) -> Self {
        self.excluded.push(tenant.into());
        self
    }

    /// The underlying strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// The queries run on every aggregation, in column order.
    pub fn queries(&self) -> &[TenantQuery] {
        match &self.strategy {
            Strategy::StoreJoin(query) => std::slice::from_ref(query),
            Strategy::UnionMerge(queries) => queries,
        }
    }

    /// Total number of columns produced.
    pub fn columns(&self) -> usize {
        self.queries().iter().map(TenantQuery::columns).sum()
    }

    /// Run every query against `store` and build the table.
    ///
    /// Any failing query fails the whole aggregation: a table missing one
    /// source would silently report zeros for it.
    pub async fn run(&self, store: &dyn Datastore) -> Result<UsageTable, DatastoreError> {
        let mut table = UsageTable::new(self.columns());
        let mut offset = 0;
        for query in self.queries() {
            let rows = store.fetch(query).await?;
            trace!(query = query.label(), rows = rows.len(), "query finished");
            table.absorb(offset, query.columns(), rows);
            offset += query.columns();
        }

        for tenant in &self.excluded {
            table.rows.remove(tenant);
        }
        Ok(table)
    }
}

/// Per-scrape table of aggregates: one row per tenant, zero-filled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsageTable {
    columns: usize,
    rows: BTreeMap<TenantId, Vec<f64>>,
}

impl UsageTable {
    /// An empty table with `columns` columns.
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Merge `rows` into columns `offset..offset + width`.
    ///
    /// Tenants not seen before get a zero row first. Rows with an empty
    /// tenant id are ignored; a tenant repeated within `rows` keeps its
    /// first values. Missing trailing values and non-finite values count
    /// as `0`.
    pub fn absorb(&mut self, offset: usize, width: usize, rows: Vec<TenantRow>) {
        debug_assert!(offset + width <= self.columns);
        let mut seen = HashSet::with_capacity(rows.len());
        for TenantRow { tenant, values } in rows {
            if tenant.is_empty() || !seen.insert(tenant.clone()) {
                continue;
            }
            let columns = self.columns;
            let row = self
                .rows
                .entry(tenant.clone())
                .or_insert_with(|| vec![0.0; columns]);
            for (i, value) in values.into_iter().take(width).enumerate() {
                row[offset + i] = if value.is_finite() { value } else { 0.0 };
            }
        }
    }

    /// Values of `tenant`, one per column.
    pub fn get(&self, tenant: &str) -> Option<&[f64]> {
        self.rows.get(tenant).map(Vec::as_slice)
    }

    /// Tenants in the table, ordered.
    pub fn tenants(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Number of tenants.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no tenant is present.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Emit one observation per column and tenant, column `i` belonging to
    /// `descriptors[i]`, the tenant as the only label value.
    pub fn into_observations(self, descriptors: &[Descriptor]) -> Vec<Observation> {
        debug_assert_eq!(self.columns, descriptors.len());
        let mut observations = Vec::with_capacity(self.rows.len() * descriptors.len());
        for (column, descriptor) in descriptors.iter().enumerate() {
            for (tenant, values) in &self.rows {
                let value = values.get(column).copied().unwrap_or(0.0);
                observations.push(Observation::new(descriptor, value, vec![tenant.clone()]));
            }
        }
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::memory::MemoryDatastore;
    use quickcheck::{quickcheck, TestResult};
    use std::borrow::Cow;
    use std::collections::BTreeSet;

    fn volumes() -> TenantQuery {
        TenantQuery::new("volumes", "SELECT project_id, COUNT(id), SUM(size) FROM volumes", 2)
    }

    fn snapshots() -> TenantQuery {
        TenantQuery::new("snapshots", "SELECT project_id, COUNT(id) FROM snapshots", 1)
    }

    fn store() -> MemoryDatastore {
        MemoryDatastore::default()
            .with_rows(
                "volumes",
                vec![
                    TenantRow::new("T1", vec![2.0, 10.0]),
                    TenantRow::new("T2", vec![12.0, 43.0]),
                ],
            )
            .with_rows(
                "snapshots",
                vec![TenantRow::new("T1", vec![2.0]), TenantRow::new("T3", vec![5.0])],
            )
    }

    #[tokio::test]
    async fn union_merge_zero_fills() {
        let aggregation = Aggregation::union_merge(vec![volumes(), snapshots()]);
        let table = aggregation.run(&store()).await.unwrap();

        assert_eq!(3, aggregation.columns());
        assert_eq!(vec!["T1", "T2", "T3"], table.tenants().collect::<Vec<_>>());
        assert_eq!(Some(&[2.0, 10.0, 2.0][..]), table.get("T1"));
        assert_eq!(Some(&[12.0, 43.0, 0.0][..]), table.get("T2"));
        assert_eq!(Some(&[0.0, 0.0, 5.0][..]), table.get("T3"));
    }

    #[tokio::test]
    async fn store_join_keeps_rows() {
        let aggregation = Aggregation::store_join(volumes());
        let table = aggregation.run(&store()).await.unwrap();

        assert_eq!(2, table.len());
        assert_eq!(Some(&[12.0, 43.0][..]), table.get("T2"));
        assert!(table.get("T3").is_none());
    }

    #[tokio::test]
    async fn failing_query_fails_aggregation() {
        let store = store().fail("snapshots");
        let aggregation = Aggregation::union_merge(vec![volumes(), snapshots()]);

        let err = aggregation.run(&store).await.unwrap_err();
        assert_eq!(Some("snapshots"), err.query());
    }

    #[tokio::test]
    async fn excluded_tenant_is_dropped() {
        let sentinel = "00000000-0000-0000-0000-000000000000";
        let store = MemoryDatastore::default().with_rows(
            "zones",
            vec![TenantRow::new(sentinel, vec![7.0]), TenantRow::new("T1", vec![1.0])],
        );
        let aggregation =
            Aggregation::store_join(TenantQuery::new("zones", "SELECT ...", 1)).excluding(sentinel);

        let table = aggregation.run(&store).await.unwrap();
        assert_eq!(vec!["T1"], table.tenants().collect::<Vec<_>>());
    }

    #[test]
    fn absorb_ignores_empty_and_repeated_tenants() {
        let mut table = UsageTable::new(1);
        table.absorb(
            0,
            1,
            vec![
                TenantRow::new("", vec![1.0]),
                TenantRow::new("T1", vec![f64::NAN]),
                TenantRow::new("T1", vec![4.0]),
                TenantRow::new("T2", vec![]),
            ],
        );

        assert_eq!(vec!["T1", "T2"], table.tenants().collect::<Vec<_>>());
        assert_eq!(Some(&[0.0][..]), table.get("T1"));
        assert_eq!(Some(&[0.0][..]), table.get("T2"));
    }

    #[test]
    fn into_observations_per_column_and_tenant() {
        let mut table = UsageTable::new(2);
        table.absorb(0, 1, vec![TenantRow::new("T1", vec![1.0])]);
        table.absorb(1, 1, vec![TenantRow::new("T2", vec![2.0])]);

        let descriptors = vec![
            Descriptor::new("a", "a", vec![Cow::Borrowed("project_id")]),
            Descriptor::new("b", "b", vec![Cow::Borrowed("project_id")]),
        ];
        let observations: Vec<_> = table
            .into_observations(&descriptors)
            .into_iter()
            .map(|o| (o.descriptor().name().to_owned(), o.label_values()[0].clone(), o.value()))
            .collect();

        assert_eq!(
            vec![
                ("a".to_owned(), "T1".to_owned(), 1.0),
                ("a".to_owned(), "T2".to_owned(), 0.0),
                ("b".to_owned(), "T1".to_owned(), 0.0),
                ("b".to_owned(), "T2".to_owned(), 2.0),
            ],
            observations
        );
    }

    #[test]
    fn union_merge_properties() {
        fn prop(first: Vec<(u8, u16)>, second: Vec<(u8, u16)>) -> TestResult {
            let rows = |input: &[(u8, u16)]| -> Vec<TenantRow> {
                input
                    .iter()
                    .map(|(tenant, value)| TenantRow::new(format!("t{tenant}"), vec![f64::from(*value)]))
                    .collect()
            };

            let mut table = UsageTable::new(2);
            table.absorb(0, 1, rows(&first));
            table.absorb(1, 1, rows(&second));

            // Tenant set is the union of both inputs.
            let expected: BTreeSet<String> = first
                .iter()
                .chain(second.iter())
                .map(|(tenant, _)| format!("t{tenant}"))
                .collect();
            let actual: BTreeSet<String> = table.tenants().map(str::to_owned).collect();
            if expected != actual {
                return TestResult::failed();
            }

            // Each column holds the first value seen for a tenant, or zero.
            for (column, input) in [&first, &second].into_iter().enumerate() {
                for tenant in &expected {
                    let value = input
                        .iter()
                        .find(|(t, _)| &format!("t{t}") == tenant)
                        .map(|(_, v)| f64::from(*v))
                        .unwrap_or(0.0);
                    if table.get(tenant).map(|row| row[column]) != Some(value) {
                        return TestResult::failed();
                    }
                }
            }

            // At most one observation per (metric, tenant).
            let descriptors = vec![
                Descriptor::new("a", "a", vec![Cow::Borrowed("project_id")]),
                Descriptor::new("b", "b", vec![Cow::Borrowed("project_id")]),
            ];
            let observations = table.into_observations(&descriptors);
            let unique: HashSet<(String, String)> = observations
                .iter()
                .map(|o| (o.descriptor().name().to_owned(), o.label_values()[0].clone()))
                .collect();
            TestResult::from_bool(unique.len() == observations.len() && unique.len() == expected.len() * 2)
        }

        quickcheck(prop as fn(_, _) -> _);
    }
}
