use crate::attributes::ClusterTuningAttributes;
use serde_json::{Map, Value};

/// Postgres parameters that Patroni requires to be identical on every member, and therefore
/// manages through the DCS instead of the local `postgresql.conf`.
pub const DCS_POSTGRESQL_PARAMETERS: &[&str] = &[
    "max_connections",
    "max_locks_per_transaction",
    "max_worker_processes",
    "max_prepared_transactions",
    "track_commit_timestamp",
    "max_wal_senders",
    "max_replication_slots",
    "wal_keep_segments",
    "wal_keep_size",
    "checkpoint_timeout",
];

/// Carries the DCS-managed parameters from the node's `postgresql` settings into the Patroni
/// parameter map, without overriding anything set explicitly for Patroni.
///
/// pg_rewind refuses to run unless `wal_log_hints` is on, so it is forced when `use_pg_rewind`
/// is enabled.
pub fn resolve_parameters(attrs: &mut ClusterTuningAttributes, postgresql: &Map<String, Value>) {
    for name in DCS_POSTGRESQL_PARAMETERS {
        let explicit = attrs
            .postgresql
            .get(*name)
            .map_or(false, |value| !value.is_null());
        if explicit {
            continue;
        }
        if let Some(value) = postgresql.get(*name).filter(|value| !value.is_null()) {
            trace!("Using postgresql['{}'] = {} for Patroni", name, value);
            attrs.postgresql.insert(name.to_string(), value.clone());
        }
    }

    if attrs.use_pg_rewind == Some(true) {
        attrs
            .postgresql
            .insert("wal_log_hints".to_string(), Value::from("on"));
    }
}
