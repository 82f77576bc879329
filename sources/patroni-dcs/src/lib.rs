/*!
# Introduction

patroni-dcs builds the dynamic configuration document that Patroni keeps in its distributed
configuration store (DCS).

Patroni reads the cluster-wide part of its configuration from a single document under the
cluster's `/config` key.  The node attributes that feed it are flat and user-facing
(`patroni['ttl']`, `patroni['replication_slots']`, ...); [`build`] maps them onto the nested
schema the DCS expects:

```text
{
  "loop_wait": 10, "ttl": 30, ...,
  "postgresql": { "use_pg_rewind": false, "use_slots": true, "parameters": { ... } },
  "slots": { "<name>": { "type": "physical" } },
  "standby_cluster": { "host": ..., "port": ..., "primary_slot_name": ... }
}
```

[`resolve_parameters`] runs first when Postgres settings from the node's `postgresql` section
need to be carried into the DCS document.

Neither function talks to the DCS; writing the document is left to the caller.
*/

#[macro_use]
extern crate log;

mod attributes;
mod dcs;
mod parameters;

pub use attributes::{ClusterTuningAttributes, SlotOptions, StandbyClusterAttributes};
pub use dcs::{
    build, DynamicClusterConfig, PostgresqlConfig, Slot, SlotType, StandbyCluster,
    DCS_ROOT_SETTINGS,
};
pub use parameters::{resolve_parameters, DCS_POSTGRESQL_PARAMETERS};
