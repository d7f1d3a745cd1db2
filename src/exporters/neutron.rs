//! Networking usage from the `neutron` database.
//!
//! Only routers with their gateway port on the configured external network
//! are counted.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const FLOATING_IPS: &str = "SELECT project_id, COUNT(id) AS total_fips \
    FROM floatingips GROUP BY project_id";

const ROUTERS: &str = "SELECT r.project_id, COUNT(r.id) AS total_routers \
    FROM routers r INNER JOIN ports p ON r.gw_port_id = p.id \
    WHERE p.network_id = ? GROUP BY r.project_id";

pub(crate) fn aggregation(external_network_id: &str) -> Aggregation {
    Aggregation::union_merge(vec![
        TenantQuery::new("floating_ips", FLOATING_IPS, 1),
        TenantQuery::new("routers", ROUTERS, 1).bind(external_network_id),
    ])
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![
        project_gauge(
            "openstack_project_floating_ips",
            "Total number of floating IPs per OpenStack project",
        ),
        project_gauge(
            "openstack_project_routers",
            "Total number of routers per OpenStack project",
        ),
    ]
}
