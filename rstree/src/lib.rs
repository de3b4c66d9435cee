//! Convert flat parent-referencing records into nested trees and back.
//!
//! The typed core lives in [`domain`]: an arena-backed [`domain::Forest`]
//! assembled by [`domain::ForestBuilder`]. The [`application`] layer adapts
//! it to JSON documents, [`cli`] exposes it as the `rstree` binary.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;

pub use application::{
    find_tree_node_paths, flatten_tree_data, parse_tree_data, ConvertOptions, KeyNames,
};
pub use domain::{DuplicatePolicy, Forest, ForestBuilder, NodeKey, OrphanPolicy, TreeError};
