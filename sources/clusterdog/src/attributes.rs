//! Loads a node's attributes and lays them over the shipped defaults.

use crate::{error, Result};
use patroni_dcs::ClusterTuningAttributes;
use praefect_topology::PraefectSettings;
use serde::{Deserialize, Deserializer};
use serde_json::{map::Entry, Map, Value};
use snafu::{ensure, ResultExt};
use std::fs;
use std::mem;
use std::path::Path;

const DEFAULTS: &str = include_str!("../defaults.toml");

/// A section set to null in the attributes file is treated as if it were left out.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The sections of a node's attributes that clusterdog acts on.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NodeAttributes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) patroni: ClusterTuningAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) praefect: PraefectSettings,
    #[serde(default, deserialize_with = "null_as_default")]
    pub(crate) postgresql: Map<String, Value>,
}

/// Read node attributes from a JSON file, with defaults applied.
pub(crate) fn from_path<P>(path: P) -> Result<NodeAttributes>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let attributes_str =
        fs::read_to_string(path).context(error::ReadAttributesSnafu { path })?;
    let attributes: Value =
        serde_json::from_str(&attributes_str).context(error::ParseAttributesSnafu { path })?;
    with_defaults(&attributes)
}

/// Merge the given attributes over the defaults and deserialize the result.
pub(crate) fn with_defaults(attributes: &Value) -> Result<NodeAttributes> {
    let mut merged = defaults()?;
    merge_values(&mut merged, attributes, "")?;
    serde_json::from_value(merged).context(error::DeserializeAttributesSnafu)
}

fn defaults() -> Result<Value> {
    let defaults: toml::Value = toml::from_str(DEFAULTS).context(error::ParseDefaultsSnafu)?;
    serde_json::to_value(defaults).context(error::ConvertDefaultsSnafu)
}

/// This modifies the first given Value by inserting any values from the second Value.
///
/// Scalars and arrays on the right replace the left.  Objects are merged key by key,
/// recursively, so nested defaults the right side doesn't mention survive.  Null on either side
/// means "unset", so it is replaced or replaces without a type check.  Any other type mismatch
/// is an error naming the offending key.
pub(crate) fn merge_values(merge_into: &mut Value, merge_from: &Value, key: &str) -> Result<()> {
    if merge_into.is_null() || merge_from.is_null() {
        *merge_into = merge_from.clone();
        return Ok(());
    }

    ensure!(
        mem::discriminant(merge_into) == mem::discriminant(merge_from),
        error::DataTypeMismatchSnafu { key }
    );

    match (merge_into, merge_from) {
        (Value::Object(left), Value::Object(right)) => {
            for (k, v) in right {
                let nested_key = if key.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", key, k)
                };
                match left.entry(k.clone()) {
                    Entry::Vacant(e) => {
                        e.insert(v.clone());
                    }
                    Entry::Occupied(mut e) => {
                        merge_values(e.get_mut(), v, &nested_key)?;
                    }
                }
            }
        }
        (left, right) => *left = right.clone(),
    }

    Ok(())
}
