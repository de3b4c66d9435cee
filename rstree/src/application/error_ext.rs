//! Error conversion helpers for I/O and JSON operations
//!
//! Extension traits attach the input being processed to low-level errors.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// std::fs::read_to_string(&path).with_path_context("read input", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Io {
            context: format!("{}: {}", action, path.display()),
            source,
        })
    }
}

/// Extension trait for `serde_json::Result`, naming the input source.
pub trait JsonResultExt<T> {
    fn with_source_context(self, source_name: &str) -> ApplicationResult<T>;
}

impl<T> JsonResultExt<T> for serde_json::Result<T> {
    fn with_source_context(self, source_name: &str) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Json {
            context: source_name.to_string(),
            source,
        })
    }
}
