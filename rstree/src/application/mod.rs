//! Application layer: JSON records, input/output and rendering
//!
//! This layer adapts the typed domain core to JSON documents.

pub mod convert;
pub mod error;
pub mod error_ext;
pub mod io;
pub mod render;

pub use convert::{
    build_forest, dispose, ensure_depth, find_tree_node_paths, flatten_tree_data, nest,
    parse_tree_data, records_from, to_array, ConvertOptions, KeyNames, Record,
};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{IoResultExt, JsonResultExt};
pub use io::{read_json, InputSource};
pub use render::{ForestStats, TreeNodeConvert};
