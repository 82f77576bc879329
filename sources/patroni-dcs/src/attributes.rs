use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Treats an explicit null like a missing key, so a section set to nil in the node's attributes
/// comes out empty rather than failing deserialization.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The HA-relevant part of a node's `patroni` attributes.
///
/// Values are taken as given; defaults are applied by whoever resolves the node's attributes,
/// and anything left unset here is published as null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClusterTuningAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,

    pub loop_wait: Option<u64>,
    pub ttl: Option<u64>,
    pub retry_timeout: Option<u64>,
    pub maximum_lag_on_failover: Option<u64>,
    pub max_timelines_history: Option<u64>,
    pub master_start_timeout: Option<u64>,

    pub use_pg_rewind: Option<bool>,
    pub use_slots: Option<bool>,

    /// Postgres runtime parameters, published verbatim.
    #[serde(default, deserialize_with = "null_as_default")]
    pub postgresql: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub replication_slots: IndexMap<String, SlotOptions>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub standby_cluster: StandbyClusterAttributes,
}

/// Options declared for one replication slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlotOptions {
    #[serde(rename = "type")]
    pub slot_type: Option<String>,

    // Logical slots carry `database` and `plugin`; kept so they survive deserialization.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StandbyClusterAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub primary_slot_name: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty() {
        let attrs: ClusterTuningAttributes = serde_json::from_value(json!({})).unwrap();
        assert_eq!(attrs, ClusterTuningAttributes::default());
    }

    #[test]
    fn unrelated_attributes_ignored() {
        let attrs: ClusterTuningAttributes = serde_json::from_value(json!({
            "enable": true,
            "listen_address": "0.0.0.0:8008",
            "ttl": 30,
        }))
        .unwrap();
        assert!(attrs.enable);
        assert_eq!(attrs.ttl, Some(30));
    }

    #[test]
    fn null_sections_are_empty() {
        let attrs: ClusterTuningAttributes = serde_json::from_value(json!({
            "enable": true,
            "postgresql": null,
            "replication_slots": null,
            "standby_cluster": {"enable": null, "host": null},
        }))
        .unwrap();
        assert!(attrs.enable);
        assert!(attrs.postgresql.is_empty());
        assert!(attrs.replication_slots.is_empty());
        assert_eq!(attrs.standby_cluster, StandbyClusterAttributes::default());
    }

    #[test]
    fn null_standby_cluster() {
        let attrs: ClusterTuningAttributes =
            serde_json::from_value(json!({"standby_cluster": null})).unwrap();
        assert!(!attrs.standby_cluster.enable);
    }

    #[test]
    fn slot_options() {
        let attrs: ClusterTuningAttributes = serde_json::from_value(json!({
            "replication_slots": {
                "geo": {"type": "physical"},
                "cdc": {"type": "logical", "database": "app", "plugin": "pgoutput"},
                "bare": {},
            }
        }))
        .unwrap();
        let slots = &attrs.replication_slots;
        assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["geo", "cdc", "bare"]);
        assert_eq!(slots["geo"].slot_type.as_deref(), Some("physical"));
        assert_eq!(slots["cdc"].other["plugin"], json!("pgoutput"));
        assert_eq!(slots["bare"].slot_type, None);
    }
}
