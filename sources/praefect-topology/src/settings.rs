use crate::{normalize, Normalized, Notice, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Treats an explicit null like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `praefect` section of a node's attributes, limited to what topology handling needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PraefectSettings {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable: bool,
    pub failover_election_strategy: Option<String>,
    pub virtual_storages: Option<Value>,
}

impl PraefectSettings {
    /// Returns a notice if the deprecated election strategy is set on an enabled Praefect.
    pub fn election_strategy_notice(&self) -> Option<Notice> {
        (self.enable && self.failover_election_strategy.is_some())
            .then_some(Notice::ElectionStrategyDeprecated)
    }

    /// Normalizes this node's `virtual_storages`.
    pub fn normalize_virtual_storages(&self) -> Result<Normalized> {
        normalize(self.virtual_storages.as_ref())
    }
}
