use crate::attributes::ClusterTuningAttributes;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Root-level keys of the DCS document, in the order they are written.
pub const DCS_ROOT_SETTINGS: [&str; 6] = [
    "loop_wait",
    "ttl",
    "retry_timeout",
    "maximum_lag_on_failover",
    "max_timelines_history",
    "master_start_timeout",
];

/// The only slot type Patroni is asked to manage.
const PHYSICAL: &str = "physical";

/// The document published to the DCS.  Field order matches `DCS_ROOT_SETTINGS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicClusterConfig {
    pub loop_wait: Option<u64>,
    pub ttl: Option<u64>,
    pub retry_timeout: Option<u64>,
    pub maximum_lag_on_failover: Option<u64>,
    pub max_timelines_history: Option<u64>,
    pub master_start_timeout: Option<u64>,
    pub postgresql: PostgresqlConfig,
    pub slots: IndexMap<String, Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standby_cluster: Option<StandbyCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostgresqlConfig {
    pub use_pg_rewind: Option<bool>,
    pub use_slots: Option<bool>,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    #[serde(rename = "type")]
    pub slot_type: SlotType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Physical,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StandbyCluster {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub primary_slot_name: Option<String>,
}

/// Builds the DCS document from a node's attributes.
///
/// Slots with any type other than `physical`, including no type at all, are left out.
pub fn build(attrs: &ClusterTuningAttributes) -> DynamicClusterConfig {
    let mut dcs = DynamicClusterConfig {
        loop_wait: attrs.loop_wait,
        ttl: attrs.ttl,
        retry_timeout: attrs.retry_timeout,
        maximum_lag_on_failover: attrs.maximum_lag_on_failover,
        max_timelines_history: attrs.max_timelines_history,
        master_start_timeout: attrs.master_start_timeout,
        postgresql: PostgresqlConfig {
            use_pg_rewind: attrs.use_pg_rewind,
            use_slots: attrs.use_slots,
            parameters: Map::new(),
        },
        slots: IndexMap::new(),
        standby_cluster: None,
    };

    for (key, value) in &attrs.postgresql {
        dcs.postgresql.parameters.insert(key.clone(), value.clone());
    }

    for (name, options) in &attrs.replication_slots {
        match options.slot_type.as_deref() {
            Some(PHYSICAL) => {
                dcs.slots.insert(
                    name.clone(),
                    Slot {
                        slot_type: SlotType::Physical,
                    },
                );
            }
            other => debug!(
                "Leaving replication slot '{}' out of DCS config, type {:?} is not managed",
                name, other
            ),
        }
    }

    if attrs.standby_cluster.enable {
        let standby = &attrs.standby_cluster;
        dcs.standby_cluster = Some(StandbyCluster {
            host: standby.host.clone(),
            port: standby.port,
            primary_slot_name: standby.primary_slot_name.clone(),
        });
    }

    dcs
}
