//! Domain layer: typed tree core
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod error;
pub mod key;
pub mod path;

pub use arena::{Forest, ForestNode};
pub use builder::{DuplicatePolicy, FlatNode, ForestBuilder, OrphanPolicy};
pub use error::{TreeError, TreeResult};
pub use key::NodeKey;
pub use path::find_path;
