//! Reading and writing JSON documents

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::error_ext::{IoResultExt, JsonResultExt};
use crate::application::{ApplicationError, ApplicationResult};

/// Where a JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `None` and `-` mean stdin.
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p != Path::new("-") => InputSource::File(p.to_path_buf()),
            _ => InputSource::Stdin,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parse a JSON document. Blank input reads as `null`.
pub fn parse_json(text: &str, source_name: &str) -> ApplicationResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).with_source_context(source_name)
}

#[instrument(level = "debug")]
pub fn read_json(source: &InputSource) -> ApplicationResult<Value> {
    let text = match source {
        InputSource::File(path) => std::fs::read_to_string(path).with_path_context("read input", path)?,
        InputSource::Stdin => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|source| ApplicationError::Io {
                    context: "read stdin".to_string(),
                    source,
                })?;
            buf
        }
    };
    debug!(bytes = text.len(), "input read");
    parse_json(&text, &source.to_string())
}

/// Serialize as pretty (default) or compact JSON.
pub fn to_json_string<S: Serialize + ?Sized>(value: &S, compact: bool) -> ApplicationResult<String> {
    let result = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    result.with_source_context("output")
}
