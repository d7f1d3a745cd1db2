//! Metric registry implementation.
//!
//! See [`Registry`] for details.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::metrics::family::MetricFamily;
use crate::metrics::MetricType;

/// A collector registry.
///
/// Collectors are registered once at startup via
/// [`Registry::register_collector`]. Every call to [`Registry::scrape`] then
/// asks each collector for a fresh set of observations and merges them into
/// one [`Snapshot`], ready to be passed to
/// [`encode`](crate::encoding::text::encode).
///
/// The registry is never mutated after startup, so it can be shared between
/// concurrent scrapes behind an [`Arc`].
///
/// ```
/// # use openstack_usage_exporter::datastore::memory::MemoryDatastore;
/// # use openstack_usage_exporter::exporters::Domain;
/// # use openstack_usage_exporter::registry::{Registry, RegistryState};
/// # use std::sync::Arc;
/// #
/// let store = Arc::new(MemoryDatastore::default());
///
/// let mut registry = Registry::default();
/// assert_eq!(RegistryState::Unconfigured, registry.state());
///
/// registry
///     .register_collector(Box::new(Domain::Octavia.collector(store)))
///     .unwrap();
/// assert_eq!(RegistryState::Ready, registry.state());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    collectors: Vec<Box<dyn Collector>>,
    names: HashSet<String>,
}

/// Lifecycle of a [`Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
    /// No collector registered yet.
    Unconfigured,
    /// At least one collector registered, scrapes may be served.
    Ready,
}

/// Errors raised while assembling a [`Registry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A metric name was declared twice.
    #[error("metric `{name}` declared by collector `{collector}` is already registered")]
    DuplicateMetric {
        /// The colliding metric name.
        name: String,
        /// The collector that was rejected.
        collector: String,
    },

    /// A metric name the text exposition cannot carry.
    #[error("metric `{name}` declared by collector `{collector}` is not a valid metric name")]
    InvalidMetricName {
        /// The offending metric name.
        name: String,
        /// The collector that was rejected.
        collector: String,
    },
}

impl Registry {
    /// Register a [`Collector`].
    ///
    /// Fails if any metric name the collector declares does not match
    /// `[a-zA-Z_:][a-zA-Z0-9_:]*`, is already known to the registry, or
    /// repeats within the collector itself. A rejected collector leaves the
    /// registry untouched.
    pub fn register_collector(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        let mut pending = HashSet::new();
        for descriptor in collector.describe() {
            let name = descriptor.name();
            if !is_valid_metric_name(name) {
                return Err(RegistryError::InvalidMetricName {
                    name: name.to_owned(),
                    collector: collector.name().to_owned(),
                });
            }
            if self.names.contains(name) || !pending.insert(name.to_owned()) {
                return Err(RegistryError::DuplicateMetric {
                    name: name.to_owned(),
                    collector: collector.name().to_owned(),
                });
            }
        }

        debug!(
            collector = collector.name(),
            metrics = pending.len(),
            "collector registered"
        );
        self.names.extend(pending);
        self.collectors.push(collector);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        if self.collectors.is_empty() {
            RegistryState::Unconfigured
        } else {
            RegistryState::Ready
        }
    }

    /// Iterate the descriptors of all registered collectors, in registration
    /// order.
    pub fn describe(&self) -> impl Iterator<Item = &Descriptor> {
        self.collectors.iter().flat_map(|c| c.describe().iter())
    }

    /// Run one scrape across all registered collectors.
    ///
    /// Collectors run concurrently. A collector that fails contributes fewer
    /// (or no) families; the scrape as a whole never fails. Observations a
    /// collector did not declare, with the wrong label arity, or repeating a
    /// label set already seen are dropped.
    pub async fn scrape(&self) -> Snapshot {
        let collected = join_all(
            self.collectors
                .iter()
                .map(|collector| async move { (collector, collector.collect().await) }),
        )
        .await;

        let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
        for (collector, observations) in collected {
            let declared = collector.describe();
            for observation in observations {
                let descriptor = observation.descriptor();
                if !declared.contains(descriptor) {
                    warn!(
                        collector = collector.name(),
                        metric = descriptor.name(),
                        "dropping observation for undeclared metric"
                    );
                    continue;
                }
                if observation.label_values().len() != descriptor.label_names().len() {
                    warn!(
                        collector = collector.name(),
                        metric = descriptor.name(),
                        "dropping observation with mismatched label values"
                    );
                    continue;
                }

                let family = families
                    .entry(descriptor.name().to_owned())
                    .or_insert_with(|| MetricFamily::new(descriptor.clone()));
                let (label_values, value) = observation.into_sample();
                if !family.insert(label_values, value) {
                    warn!(
                        collector = collector.name(),
                        metric = family.descriptor().name(),
                        "dropping duplicate observation"
                    );
                }
            }
        }

        let snapshot: Snapshot = families.into_values().collect();
        debug!(
            families = snapshot.families().len(),
            samples = snapshot.sample_count(),
            "scrape complete"
        );
        snapshot
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// The result of one scrape: metric families sorted by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Snapshot {
    /// The metric families, sorted by name.
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Look up a family by metric name.
    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families
            .binary_search_by(|f| f.descriptor().name().cmp(name))
            .ok()
            .map(|i| &self.families[i])
    }

    /// Value of the sample with the given metric name and label values.
    pub fn value(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        self.family(name)?.get(label_values)
    }

    /// Total number of samples over all families.
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(MetricFamily::len).sum()
    }

    /// Whether the snapshot holds no family at all.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl FromIterator<MetricFamily> for Snapshot {
    fn from_iter<I: IntoIterator<Item = MetricFamily>>(iter: I) -> Self {
        let mut families: Vec<MetricFamily> = iter.into_iter().filter(|f| !f.is_empty()).collect();
        families.sort_by(|a, b| a.descriptor().name().cmp(b.descriptor().name()));
        Snapshot { families }
    }
}

/// Metric descriptor: name, help text, label names and type.
///
/// Cheap to clone; every [`Observation`](crate::metrics::gauge::Observation)
/// carries one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: Arc<str>,
    help: Arc<str>,
    label_names: Arc<[Cow<'static, str>]>,
    metric_type: MetricType,
}

impl Descriptor {
    /// Create a new gauge [`Descriptor`].
    pub fn new<N: Into<String>, H: Into<String>>(
        name: N,
        help: H,
        label_names: Vec<Cow<'static, str>>,
    ) -> Self {
        Descriptor {
            name: name.into().into(),
            help: help.into().into(),
            label_names: label_names.into(),
            metric_type: MetricType::Gauge,
        }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Returns the ordered label names.
    pub fn label_names(&self) -> &[Cow<'static, str>] {
        &self.label_names
    }

    /// Returns the metric type.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }
}
