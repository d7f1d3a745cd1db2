//! Block storage usage from the `cinder` database.

use crate::aggregation::Aggregation;
use crate::datastore::TenantQuery;
use crate::registry::Descriptor;

use super::project_gauge;

const VOLUMES: &str = "SELECT project_id, \
    COUNT(id) AS total_volumes, \
    CAST(COALESCE(SUM(size), 0) AS SIGNED) AS volumes_size_gb \
    FROM volumes WHERE deleted = 0 GROUP BY project_id";

const SNAPSHOTS: &str = "SELECT project_id, \
    COUNT(id) AS total_snapshots, \
    CAST(COALESCE(SUM(volume_size), 0) AS SIGNED) AS snapshot_size_gb \
    FROM snapshots WHERE deleted = 0 GROUP BY project_id";

const BACKUPS: &str = "SELECT project_id, \
    COUNT(id) AS total_backups, \
    CAST(COALESCE(SUM(size), 0) AS SIGNED) AS total_backups_size_gb \
    FROM backups WHERE deleted = 0 GROUP BY project_id";

pub(crate) fn aggregation() -> Aggregation {
    Aggregation::union_merge(vec![
        TenantQuery::new("volumes", VOLUMES, 2),
        TenantQuery::new("snapshots", SNAPSHOTS, 2),
        TenantQuery::new("backups", BACKUPS, 2),
    ])
}

pub(crate) fn descriptors() -> Vec<Descriptor> {
    vec![
        project_gauge(
            "openstack_project_volumes",
            "Total number of volumes per OpenStack project",
        ),
        project_gauge(
            "openstack_project_volume_size_gb",
            "Total volume size in GB per OpenStack project",
        ),
        project_gauge(
            "openstack_project_snapshots",
            "Total number of snapshots per OpenStack project",
        ),
        project_gauge(
            "openstack_project_snapshots_size_gb",
            "Total size of snapshots in GB per OpenStack project",
        ),
        project_gauge(
            "openstack_project_backups",
            "Total number of backups per OpenStack project",
        ),
        project_gauge(
            "openstack_project_backups_size_gb",
            "Total size of backups in GB per OpenStack project",
        ),
    ]
}
