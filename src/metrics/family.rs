//! Module implementing a metric family.
//!
//! See [`MetricFamily`] for details.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::registry::Descriptor;

/// A set of samples sharing one [`Descriptor`], differentiated by their label
/// values.
///
/// Samples are kept ordered by label values, and a label set can be present
/// at most once.
///
/// ```
/// # use openstack_usage_exporter::metrics::family::MetricFamily;
/// # use openstack_usage_exporter::registry::Descriptor;
/// # use std::borrow::Cow;
/// #
/// let descriptor = Descriptor::new(
///     "openstack_project_zones",
///     "Total number of zones per OpenStack project",
///     vec![Cow::Borrowed("project_id")],
/// );
/// let mut family = MetricFamily::new(descriptor);
///
/// assert!(family.insert(vec!["b".to_owned()], 3.0));
/// assert!(family.insert(vec!["a".to_owned()], 5.0));
/// assert!(!family.insert(vec!["a".to_owned()], 9.0));
///
/// assert_eq!(Some(5.0), family.get(&["a"]));
/// let tenants: Vec<_> = family.samples().map(|(labels, _)| labels[0].as_str()).collect();
/// assert_eq!(vec!["a", "b"], tenants);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    descriptor: Descriptor,
    samples: BTreeMap<Vec<String>, f64>,
}

impl MetricFamily {
    /// Create an empty family for the given descriptor.
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            samples: BTreeMap::new(),
        }
    }

    /// Add a sample. Returns `false`, keeping the existing value, if the label
    /// set is already present.
    pub fn insert(&mut self, label_values: Vec<String>, value: f64) -> bool {
        match self.samples.entry(label_values) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// The value recorded for the given label values.
    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.samples.get(&key).copied()
    }

    /// The family's descriptor.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Iterate the samples ordered by label values.
    pub fn samples(&self) -> impl Iterator<Item = (&[String], f64)> {
        self.samples
            .iter()
            .map(|(labels, value)| (labels.as_slice(), *value))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the family holds no sample.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
