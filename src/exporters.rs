//! Per-service usage collectors.
//!
//! Every OpenStack service owning billable resources gets one [`Domain`]. A
//! domain knows its database, its queries and the gauges it exports; turning
//! it into a [`Collector`] takes a [`Datastore`] connected to that database.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::aggregation::Aggregation;
use crate::collector::Collector;
use crate::datastore::Datastore;
use crate::metrics::gauge::Observation;
use crate::registry::Descriptor;

pub mod cinder;
pub mod designate;
pub mod manila;
pub mod neutron;
pub mod nova;
pub mod nova_trait;
pub mod octavia;

/// Label carrying the tenant on every usage gauge.
pub const PROJECT_LABEL: &str = "project_id";

/// A resource domain, one per exporting service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Block storage: volumes, snapshots and backups.
    Cinder,
    /// Compute: vcpus and memory of running instances.
    Nova,
    /// Compute, restricted to instances booted from images requiring a trait.
    NovaTrait {
        /// Image trait, e.g. `CUSTOM_WINDOWS`.
        image_trait: String,
    },
    /// Networking: floating IPs and externally connected routers.
    Neutron {
        /// Network routers must have their gateway port on to be counted.
        external_network_id: String,
    },
    /// DNS zones.
    Designate,
    /// Load balancers.
    Octavia,
    /// File shares, share snapshots and share backups.
    Manila,
}

impl Domain {
    /// Name used in logs and configuration, e.g. `nova-trait`.
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Cinder => "cinder",
            Domain::Nova => "nova",
            Domain::NovaTrait { .. } => "nova-trait",
            Domain::Neutron { .. } => "neutron",
            Domain::Designate => "designate",
            Domain::Octavia => "octavia",
            Domain::Manila => "manila",
        }
    }

    /// Name of the service database: the domain name up to the first `-`.
    pub fn database(&self) -> &'static str {
        let name = self.name();
        name.split_once('-').map_or(name, |(database, _)| database)
    }

    /// Build the domain's collector on top of `store`.
    pub fn collector(&self, store: Arc<dyn Datastore>) -> UsageCollector {
        let (aggregation, descriptors) = match self {
            Domain::Cinder => (cinder::aggregation(), cinder::descriptors()),
            Domain::Nova => (nova::aggregation(), nova::descriptors()),
            Domain::NovaTrait { image_trait } => (
                nova_trait::aggregation(image_trait),
                nova_trait::descriptors(image_trait),
            ),
            Domain::Neutron {
                external_network_id,
            } => (
                neutron::aggregation(external_network_id),
                neutron::descriptors(),
            ),
            Domain::Designate => (designate::aggregation(), designate::descriptors()),
            Domain::Octavia => (octavia::aggregation(), octavia::descriptors()),
            Domain::Manila => (manila::aggregation(), manila::descriptors()),
        };

        UsageCollector::new(self.name(), store, aggregation, descriptors)
    }
}

/// Gauge descriptor labelled by [`PROJECT_LABEL`].
pub(crate) fn project_gauge(name: impl Into<String>, help: impl Into<String>) -> Descriptor {
    Descriptor::new(name, help, vec![Cow::Borrowed(PROJECT_LABEL)])
}

/// A [`Collector`] reporting one gauge per aggregated column and tenant.
///
/// Descriptor `i` takes its values from column `i` of the aggregation.
#[derive(Debug)]
pub struct UsageCollector {
    name: &'static str,
    store: Arc<dyn Datastore>,
    aggregation: Aggregation,
    descriptors: Vec<Descriptor>,
}

impl UsageCollector {
    /// Create a collector named `name`.
    ///
    /// # Panics
    ///
    /// In debug builds, if the aggregation does not yield exactly one column
    /// per descriptor.
    pub fn new(
        name: &'static str,
        store: Arc<dyn Datastore>,
        aggregation: Aggregation,
        descriptors: Vec<Descriptor>,
    ) -> Self {
        debug_assert_eq!(aggregation.columns(), descriptors.len());
        Self {
            name,
            store,
            aggregation,
            descriptors,
        }
    }

    /// The aggregation run on every scrape.
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }
}

#[async_trait]
impl Collector for UsageCollector {
    fn name(&self) -> &str {
        self.name
    }

    fn describe(&self) -> &[Descriptor] {
        &self.descriptors
    }

    async fn collect(&self) -> Vec<Observation> {
        match self.aggregation.run(self.store.as_ref()).await {
            Ok(table) => {
                debug!(collector = self.name, tenants = table.len(), "collected usage");
                table.into_observations(&self.descriptors)
            }
            Err(error) => {
                warn!(
                    collector = self.name,
                    query = error.query().unwrap_or_default(),
                    %error,
                    "collection failed, skipping collector for this scrape"
                );
                Vec::new()
            }
        }
    }
}
