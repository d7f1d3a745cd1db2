//! DNS zone usage from the `designate` database.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

/// Tenant owning zones managed by Designate itself.
pub const SERVICE_TENANT: &str = "00000000-0000-0000-0000-000000000000";

const ZONES: &str = "SELECT tenant_id, COUNT(id) AS total_zones \
    FROM zones WHERE deleted = '0' AND tenant_id != ? GROUP BY tenant_id";

pub(crate) fn aggregation() -> Aggregation {
    Aggregation::store_join(TenantQuery::new("zones", ZONES, 1).bind(SERVICE_TENANT))
        .excluding(SERVICE_TENANT)
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![project_gauge(
        "openstack_project_zones",
        "Total number of zones per OpenStack project",
    )]
}

#[cfg(test)]
mod tests {
    use super::SERVICE_TENANT;
    use crate::datastore::memory::MemoryDatastore;
    use crate::datastore::TenantRow;
    use crate::exporters::tests::{collect, sample, P1, P2};
    use crate::exporters::Domain;

    #[tokio::test]
    async fn zones() {
        let store = MemoryDatastore::default().with_rows(
            "zones",
            vec![TenantRow::new(P2, vec![5.0]), TenantRow::new(P1, vec![3.0])],
        );

        assert_eq!(
            vec![
                sample("openstack_project_zones", P1, 3.0),
                sample("openstack_project_zones", P2, 5.0),
            ],
            collect(Domain::Designate, store).await
        );
    }

    #[tokio::test]
    async fn service_tenant_is_never_reported() {
        let store = MemoryDatastore::default().with_rows(
            "zones",
            vec![TenantRow::new(SERVICE_TENANT, vec![40.0]), TenantRow::new(P1, vec![1.0])],
        );

        assert_eq!(
            vec![sample("openstack_project_zones", P1, 1.0)],
            collect(Domain::Designate, store).await
        );
    }
}
