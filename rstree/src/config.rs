//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rstree/rstree.toml`
//! 3. Local config: `<dir>/.rstree.toml`
//! 4. Environment variables: `RSTREE_*` prefix, `__` between nested keys
//!    (e.g. `RSTREE_KEYS__PRIMARY_KEY=value`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ConvertOptions, KeyNames};
use crate::domain::{DuplicatePolicy, NodeKey, OrphanPolicy};

/// Raw key names for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawKeyNames {
    pub primary_key: Option<String>,
    pub parent_key: Option<String>,
    pub children_key: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub root: Option<String>,
    pub orphans: Option<OrphanPolicy>,
    pub duplicates: Option<DuplicatePolicy>,
    pub compact: Option<bool>,
    pub max_depth: Option<usize>,
    pub keys: RawKeyNames,
}

/// Unified configuration for rstree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Root sentinel as a JSON literal (default: `null`)
    pub root: String,
    /// Handling of records whose parent is missing
    pub orphans: OrphanPolicy,
    /// Handling of repeated keys
    pub duplicates: DuplicatePolicy,
    /// Print single-line JSON
    pub compact: bool,
    /// Deepest tree printed as nested output; 0 is unlimited
    pub max_depth: usize,
    /// Record field names
    pub keys: KeyNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: "null".into(),
            orphans: OrphanPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            compact: false,
            max_depth: DEFAULT_MAX_DEPTH,
            keys: KeyNames::default(),
        }
    }
}

/// Nested JSON read back by `serde_json` stays within its recursion limit
/// (two levels per tree level: object and children array).
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Get the XDG config directory for rstree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rstree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rstree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".rstree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ApplicationError::config(format!("read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| ApplicationError::config(format!("parse {}: {}", path.display(), e)))
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::config(e.to_string())
}

impl Settings {
    /// Overlay wins for every field it specifies.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            root: overlay.root.clone().unwrap_or_else(|| self.root.clone()),
            orphans: overlay.orphans.unwrap_or(self.orphans),
            duplicates: overlay.duplicates.unwrap_or(self.duplicates),
            compact: overlay.compact.unwrap_or(self.compact),
            max_depth: overlay.max_depth.unwrap_or(self.max_depth),
            keys: KeyNames {
                primary_key: overlay
                    .keys
                    .primary_key
                    .clone()
                    .unwrap_or_else(|| self.keys.primary_key.clone()),
                parent_key: overlay
                    .keys
                    .parent_key
                    .clone()
                    .unwrap_or_else(|| self.keys.parent_key.clone()),
                children_key: overlay
                    .keys
                    .children_key
                    .clone()
                    .unwrap_or_else(|| self.keys.children_key.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory searched for `.rstree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), local_dir, None)
    }

    /// Load settings from explicit sources.
    ///
    /// `global` is the global config file, `env` replaces the process
    /// environment when given.
    pub fn load_layers(
        global: Option<&Path>,
        local_dir: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!(path = %local_path.display(), "loading local config");
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current.apply_env_overrides(env)
    }

    /// Apply RSTREE_* environment variables as explicit overrides.
    ///
    /// `source` replaces the process environment (used by tests).
    pub fn apply_env_overrides(
        mut self,
        source: Option<config::Map<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("RSTREE")
                    .prefix_separator("_")
                    .separator("__")
                    .source(source),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("root") {
            self.root = val;
        }
        if let Ok(val) = config.get_string("orphans") {
            self.orphans = val.parse().map_err(ApplicationError::config)?;
        }
        if let Ok(val) = config.get_string("duplicates") {
            self.duplicates = val.parse().map_err(ApplicationError::config)?;
        }
        if let Ok(val) = config.get_bool("compact") {
            self.compact = val;
        }
        if let Ok(val) = config.get_int("max_depth") {
            self.max_depth = usize::try_from(val)
                .map_err(|_| ApplicationError::config(format!("max_depth: {val} is negative")))?;
        }
        if let Ok(val) = config.get_string("keys.primary_key") {
            self.keys.primary_key = val;
        }
        if let Ok(val) = config.get_string("keys.parent_key") {
            self.keys.parent_key = val;
        }
        if let Ok(val) = config.get_string("keys.children_key") {
            self.keys.children_key = val;
        }

        Ok(self)
    }

    /// Validate the settings into conversion options.
    pub fn convert_options(&self) -> Result<ConvertOptions, ApplicationError> {
        let root = NodeKey::parse_literal(&self.root)
            .map_err(|e| ApplicationError::config(format!("root: {e}")))?;
        Ok(ConvertOptions {
            keys: self.keys.clone(),
            root,
            orphans: self.orphans,
            duplicates: self.duplicates,
            max_depth: (self.max_depth > 0).then_some(self.max_depth),
        })
    }

    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::config(e.to_string()))
    }
}
