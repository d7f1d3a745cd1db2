//! Metric collector implementation.
//!
//! See [`Collector`] for details.

use async_trait::async_trait;

use crate::metrics::gauge::Observation;
use crate::registry::Descriptor;

/// The [`Collector`] abstraction provides a fixed set of metric descriptors
/// and a fresh set of values for them on each scrape.
///
/// Every usage collector reads its values ad-hoc from a service database; see
/// [`UsageCollector`](crate::exporters::UsageCollector).
///
/// Register a [`Collector`] with a [`Registry`](crate::registry::Registry) via
/// [`Registry::register_collector`](crate::registry::Registry::register_collector).
///
/// ```
/// # use async_trait::async_trait;
/// # use openstack_usage_exporter::collector::Collector;
/// # use openstack_usage_exporter::metrics::gauge::Observation;
/// # use openstack_usage_exporter::registry::Descriptor;
/// # use std::borrow::Cow;
/// #
/// #[derive(Debug)]
/// struct MyCollector {
///     descriptors: Vec<Descriptor>,
/// }
///
/// #[async_trait]
/// impl Collector for MyCollector {
///     fn name(&self) -> &str {
///         "mine"
///     }
///
///     fn describe(&self) -> &[Descriptor] {
///         &self.descriptors
///     }
///
///     async fn collect(&self) -> Vec<Observation> {
///         vec![Observation::new(&self.descriptors[0], 42.0, vec!["p1".to_owned()])]
///     }
/// }
///
/// let collector = MyCollector {
///     descriptors: vec![Descriptor::new("my_gauge", "some help", vec![Cow::Borrowed("project_id")])],
/// };
/// assert_eq!(collector.describe(), collector.describe());
/// ```
#[async_trait]
pub trait Collector: std::fmt::Debug + Send + Sync + 'static {
    /// Short name used in logs, e.g. `cinder`.
    fn name(&self) -> &str;

    /// The metrics this collector emits. Fixed for the collector's lifetime.
    fn describe(&self) -> &[Descriptor];

    /// Called on each scrape.
    ///
    /// Never fails: problems reaching the backing store are logged and
    /// result in fewer (or no) observations.
    async fn collect(&self) -> Vec<Observation>;
}
