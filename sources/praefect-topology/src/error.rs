//! Contains the Error and Result types returned while normalizing Praefect virtual storages.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("virtual_storages must be a hash"))]
    VirtualStoragesNotHash,

    #[snafu(display(
        "nodes of a Praefect virtual_storage must be a hash, '{}' is not",
        virtual_storage
    ))]
    VirtualStorageNotHash { virtual_storage: String },

    #[snafu(display(
        "'nodes' of Praefect virtual_storage '{}' must be a hash",
        virtual_storage
    ))]
    NodesNotHash { virtual_storage: String },

    #[snafu(display(
        "Praefect virtual_storage '{}' declares node '{}' both under 'nodes' and as a top-level key",
        virtual_storage,
        node
    ))]
    DuplicateNode {
        virtual_storage: String,
        node: String,
    },
}

/// Result alias containing our Error type.
pub type Result<T> = std::result::Result<T, Error>;
