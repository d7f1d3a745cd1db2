//! Load balancer usage from the `octavia` database.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const LOAD_BALANCERS: &str = "SELECT project_id, COUNT(id) AS total_lbs \
    FROM load_balancer WHERE provisioning_status != 'DELETED' GROUP BY project_id";

pub(crate) fn aggregation() -> Aggregation {
    Aggregation::store_join(TenantQuery::new("load_balancers", LOAD_BALANCERS, 1))
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![project_gauge(
        "openstack_project_load_balancers",
        "Total number of load balancers per OpenStack project",
    )]
}
