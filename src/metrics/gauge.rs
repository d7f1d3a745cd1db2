//! Module implementing a constant gauge observation.
//!
//! See [`Observation`] for details.

use crate::registry::Descriptor;

/// A single gauge value for one [`Descriptor`] and one set of label values.
///
/// Observations are created fresh on every scrape by a
/// [`Collector`](crate::collector::Collector) and are never mutated once
/// emitted.
///
/// ```
/// # use openstack_usage_exporter::metrics::gauge::Observation;
/// # use openstack_usage_exporter::registry::Descriptor;
/// # use std::borrow::Cow;
/// #
/// let descriptor = Descriptor::new(
///     "openstack_project_vcpus",
///     "Total number of vcpus per OpenStack project",
///     vec![Cow::Borrowed("project_id")],
/// );
/// let observation = Observation::new(&descriptor, 8.0, vec!["6ee08ba2".to_owned()]);
///
/// assert_eq!("openstack_project_vcpus", observation.descriptor().name());
/// assert_eq!(8.0, observation.value());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    descriptor: Descriptor,
    value: f64,
    label_values: Vec<String>,
}

impl Observation {
    /// Creates a new [`Observation`].
    pub fn new(descriptor: &Descriptor, value: f64, label_values: Vec<String>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            value,
            label_values,
        }
    }

    /// The descriptor this value belongs to.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// The observed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The label values, ordered like the descriptor's label names.
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub(crate) fn into_sample(self) -> (Vec<String>, f64) {
        (self.label_values, self.value)
    }
}
