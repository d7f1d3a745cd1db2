#![allow(dead_code)]

use std::sync::Arc;

use openstack_usage_exporter::datastore::memory::MemoryDatastore;
use openstack_usage_exporter::datastore::{Datastore, TenantRow};
use openstack_usage_exporter::exporters::Domain;
use openstack_usage_exporter::registry::Registry;

pub const P1: &str = "6ee08ba2-2ca1-4c91-b139-4bf0dbaa4096";
pub const P2: &str = "c352b0ed-30ca-4634-9c2d-1947efc29096";

pub fn rows<const N: usize>(rows: &[(&str, [f64; N])]) -> Vec<TenantRow> {
    rows.iter()
        .map(|(tenant, values)| TenantRow::new(*tenant, values.to_vec()))
        .collect()
}

/// A registry with one collector per domain, each on its own store.
pub fn registry(domains: Vec<(Domain, MemoryDatastore)>) -> Registry {
    let mut registry = Registry::default();
    for (domain, store) in domains {
        let store: Arc<dyn Datastore> = Arc::new(store);
        registry
            .register_collector(Box::new(domain.collector(store)))
            .unwrap();
    }
    registry
}

pub fn cinder_store() -> MemoryDatastore {
    MemoryDatastore::default()
        .with_rows("volumes", rows(&[(P1, [2.0, 10.0]), (P2, [12.0, 43.0])]))
        .with_rows("snapshots", rows(&[(P1, [2.0, 8.0]), ("T3", [5.0, 20.0])]))
}

pub fn octavia_store() -> MemoryDatastore {
    MemoryDatastore::default().with_rows("load_balancers", rows(&[(P2, [5.0]), (P1, [3.0])]))
}
