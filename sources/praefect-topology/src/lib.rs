/*!
# Introduction

praefect-topology turns the user-supplied `praefect['virtual_storages']` setting into the shape
the Praefect configuration template expects:

```text
{ "<virtual storage>": { "nodes": { "<node>": { ... } }, "default_replication_factor": 2 } }
```

Older configurations listed nodes directly on the virtual storage rather than under a `nodes`
key.  Both shapes are accepted, and may be mixed within one virtual storage, as long as no node
name appears in both places.  Any use of the old shape produces a single
[`Notice::LegacyNodeSyntax`] for the whole call, which the caller is expected to surface.
*/

#[macro_use]
extern crate log;

pub mod error;
mod settings;

pub use error::{Error, Result};
pub use settings::PraefectSettings;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::{ensure, OptionExt};
use std::fmt;

/// Key holding the canonical node map of a virtual storage.
const NODES_KEY: &str = "nodes";

/// Keys that configure the virtual storage itself rather than naming a node.
const KNOWN_KEYS: &[&str] = &["default_replication_factor"];

/// A single virtual storage after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualStorage {
    /// Mapping of node name to that node's configuration (address, token, ...).
    pub nodes: Map<String, Value>,
    /// Known virtual-storage-level options, kept at the root of the record.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Virtual storages by name, in the order they were declared.
pub type NormalizedTopology = IndexMap<String, VirtualStorage>;

/// Operator-facing messages that don't stop convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// At least one node was declared directly on a virtual storage.
    LegacyNodeSyntax,
    /// The deprecated `failover_election_strategy` setting is set on an enabled Praefect.
    ElectionStrategyDeprecated,
}

impl Notice {
    /// The log level at which the caller should report this notice.
    pub fn level(&self) -> log::Level {
        match self {
            Notice::LegacyNodeSyntax => log::Level::Warn,
            Notice::ElectionStrategyDeprecated => log::Level::Info,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LegacyNodeSyntax => write!(
                f,
                "Configuring Praefect nodes directly on a virtual storage is deprecated, move \
                 them under the virtual storage's 'nodes' key"
            ),
            Notice::ElectionStrategyDeprecated => write!(
                f,
                "praefect['failover_election_strategy'] is deprecated and has no effect, the \
                 per_repository election strategy is always used"
            ),
        }
    }
}

/// The result of a successful normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub topology: NormalizedTopology,
    /// Each notice appears at most once.
    pub notices: Vec<Notice>,
}

/// Normalize the raw `virtual_storages` value.
///
/// `None` (or JSON null) means Praefect has no virtual storages configured, and gives an empty
/// topology.
pub fn normalize(raw: Option<&Value>) -> Result<Normalized> {
    let mut normalized = Normalized::default();
    let virtual_storages = match raw {
        None | Some(Value::Null) => return Ok(normalized),
        Some(value) => value
            .as_object()
            .context(error::VirtualStoragesNotHashSnafu)?,
    };

    let mut legacy_syntax_seen = false;
    for (name, config_keys) in virtual_storages {
        let (virtual_storage, used_legacy_syntax) = normalize_virtual_storage(name, config_keys)?;
        if used_legacy_syntax && !legacy_syntax_seen {
            legacy_syntax_seen = true;
            normalized.notices.push(Notice::LegacyNodeSyntax);
        }
        normalized.topology.insert(name.clone(), virtual_storage);
    }

    Ok(normalized)
}

/// Normalizes one virtual storage, returning whether any node used the legacy syntax.
fn normalize_virtual_storage(name: &str, config_keys: &Value) -> Result<(VirtualStorage, bool)> {
    let config_keys = config_keys
        .as_object()
        .context(error::VirtualStorageNotHashSnafu {
            virtual_storage: name,
        })?;

    let mut virtual_storage = VirtualStorage::default();
    match config_keys.get(NODES_KEY) {
        None | Some(Value::Null) => {}
        Some(nodes) => {
            virtual_storage.nodes = nodes
                .as_object()
                .context(error::NodesNotHashSnafu {
                    virtual_storage: name,
                })?
                .clone();
        }
    }

    let mut used_legacy_syntax = false;
    for (key, value) in config_keys.iter().filter(|(k, _)| k.as_str() != NODES_KEY) {
        if KNOWN_KEYS.contains(&key.as_str()) {
            virtual_storage.options.insert(key.clone(), value.clone());
            continue;
        }

        ensure!(
            !virtual_storage.nodes.contains_key(key),
            error::DuplicateNodeSnafu {
                virtual_storage: name,
                node: key,
            }
        );
        debug!(
            "Moving node '{}' of virtual storage '{}' under '{}'",
            key, name, NODES_KEY
        );
        virtual_storage.nodes.insert(key.clone(), value.clone());
        used_legacy_syntax = true;
    }

    Ok((virtual_storage, used_legacy_syntax))
}
