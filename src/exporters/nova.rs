//! Compute usage from the `nova` database.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const INSTANCES: &str = "SELECT project_id, \
    CAST(COALESCE(SUM(vcpus), 0) AS SIGNED) AS total_vcpus, \
    CAST(COALESCE(SUM(memory_mb), 0) AS SIGNED) AS total_ram_mb \
    FROM instances WHERE deleted = 0 GROUP BY project_id";

pub(crate) fn aggregation() -> Aggregation {
    Aggregation::store_join(TenantQuery::new("instances", INSTANCES, 2))
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![
        project_gauge(
            "openstack_project_vcpus",
            "Total number of vcpus per OpenStack project",
        ),
        project_gauge(
            "openstack_project_ram_mb",
            "Total ram usage in MB per OpenStack project",
        ),
    ]
}
