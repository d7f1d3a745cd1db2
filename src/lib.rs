#![deny(dead_code)]
#![deny(missing_docs)]
#![deny(unused)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Prometheus exporter for per-project resource usage of an OpenStack cloud.
//!
//! Usage is read straight from the service databases (Cinder, Nova, Neutron,
//! Designate, Octavia, Manila) on every scrape, aggregated per project and
//! exposed as gauges labelled with `project_id`.
//!
//! # Examples
//!
//! ```
//! use openstack_usage_exporter::datastore::memory::MemoryDatastore;
//! use openstack_usage_exporter::datastore::TenantRow;
//! use openstack_usage_exporter::encoding::text::encode;
//! use openstack_usage_exporter::exporters::Domain;
//! use openstack_usage_exporter::registry::Registry;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! // A datastore answering the zones query. In production this is a
//! // `MySqlDatastore` connected to the `designate` database.
//! let store = MemoryDatastore::default().with_rows(
//!     "zones",
//!     vec![TenantRow::new("6ee08ba2", vec![3.0])],
//! );
//!
//! // Register one collector per enabled domain.
//! let mut registry = Registry::default();
//! registry
//!     .register_collector(Box::new(Domain::Designate.collector(Arc::new(store))))
//!     .unwrap();
//!
//! // On every scrape, query all collectors and encode the snapshot.
//! let snapshot = registry.scrape().await;
//! let mut buffer = String::new();
//! encode(&mut buffer, &snapshot).unwrap();
//!
//! let expected = "# HELP openstack_project_zones Total number of zones per OpenStack project\n".to_owned() +
//!                "# TYPE openstack_project_zones gauge\n" +
//!                "openstack_project_zones{project_id=\"6ee08ba2\"} 3\n";
//! assert_eq!(expected, buffer);
//! # });
//! ```

pub mod aggregation;
pub mod collector;
pub mod config;
pub mod datastore;
pub mod encoding;
pub mod exporters;
pub mod metrics;
pub mod registry;
pub mod server;
