//! Compute usage of instances whose image requires a given trait.
//!
//! Nova records the traits an image requires in the instance's system
//! metadata as `image_trait:<TRAIT> = required`. Metric names embed the
//! lowercased trait, so one exporter instance tracks exactly one trait.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const TRAIT_INSTANCES: &str = "SELECT i.project_id AS project_id, \
    COUNT(i.id) AS total_instances, \
    CAST(COALESCE(SUM(i.vcpus), 0) AS SIGNED) AS total_vcpus \
    FROM instances i \
    INNER JOIN instance_system_metadata m ON i.uuid = m.instance_uuid \
    WHERE i.deleted = 0 AND m.key = ? AND m.value = 'required' \
    GROUP BY i.project_id";

pub(crate) fn aggregation(image_trait: &str) -> Aggregation {
    Aggregation::store_join(
        TenantQuery::new("trait_instances", TRAIT_INSTANCES, 2)
            .bind(format!("image_trait:{image_trait}")),
    )
}

pub(crate) fn descriptors(image_trait: &str) -> Vec<Descriptor> {
    let suffix = image_trait.to_lowercase();
    vec![
        project_gauge(
            format!("openstack_project_instances_trait__{suffix}"),
            format!("Total number of instances per OpenStack project with image trait {image_trait}"),
        ),
        project_gauge(
            format!("openstack_project_vcpus_trait__{suffix}"),
            format!(
                "Total number of vcpus per OpenStack project for instances with image trait {image_trait}"
            ),
        ),
    ]
}
