//! File share usage from the `manila` database.
//!
//! Manila stores its soft-delete flag as a string, hence `deleted = 'False'`.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const SHARES: &str = "SELECT project_id, \
    CAST(COALESCE(SUM(size), 0) AS SIGNED) AS shares_size \
    FROM shares WHERE deleted = 'False' GROUP BY project_id";

const SHARE_SNAPSHOTS: &str = "SELECT project_id, \
    CAST(COALESCE(SUM(size), 0) AS SIGNED) AS share_snapshots_size \
    FROM share_snapshots WHERE deleted = 'False' GROUP BY project_id";

const SHARE_BACKUPS: &str = "SELECT project_id, \
    CAST(COALESCE(SUM(size), 0) AS SIGNED) AS share_backups_size \
    FROM share_backups WHERE deleted = 'False' GROUP BY project_id";

pub(crate) fn aggregation() -> Aggregation {
    Aggregation::union_merge(vec![
        TenantQuery::new("shares", SHARES, 1),
        TenantQuery::new("share_snapshots", SHARE_SNAPSHOTS, 1),
        TenantQuery::new("share_backups", SHARE_BACKUPS, 1),
    ])
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![
        project_gauge(
            "openstack_project_shares_size_gb",
            "Total share size in GB per OpenStack project",
        ),
        project_gauge(
            "openstack_project_share_snapshots_size_gb",
            "Total share snapshot size in GB per OpenStack project",
        ),
        project_gauge(
            "openstack_project_share_backups_size_gb",
            "Total share backup size in GB per OpenStack project",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use crate::datastore::memory::MemoryDatastore;
    use crate::datastore::TenantRow;
    use crate::exporters::tests::{collect, sample, P1, P2};
    use crate::exporters::Domain;

    #[tokio::test]
    async fn share_sizes() {
        let store = MemoryDatastore::default()
            .with_rows(
                "shares",
                vec![TenantRow::new(P1, vec![2.0]), TenantRow::new(P2, vec![12.0])],
            )
            .with_rows("share_snapshots", vec![TenantRow::new(P1, vec![1.0])])
            .with_rows("share_backups", vec![TenantRow::new(P2, vec![6.0])]);

        assert_eq!(
            vec![
                sample("openstack_project_shares_size_gb", P1, 2.0),
                sample("openstack_project_shares_size_gb", P2, 12.0),
                sample("openstack_project_share_snapshots_size_gb", P1, 1.0),
                sample("openstack_project_share_snapshots_size_gb", P2, 0.0),
                sample("openstack_project_share_backups_size_gb", P1, 0.0),
                sample("openstack_project_share_backups_size_gb", P2, 6.0),
            ],
            collect(Domain::Manila, store).await
        );
    }
}
