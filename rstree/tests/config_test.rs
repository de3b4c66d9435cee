//! Layered settings loading

use std::fs;

use tempfile::TempDir;

use rstree::config::{local_config_path, Settings};
use rstree::{NodeKey, OrphanPolicy};

#[test]
fn given_local_config_when_loading_then_overrides_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::write(
        local_config_path(temp.path()),
        r#"
root = "0"
orphans = "root"

[keys]
primary_key = "code"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_layers(None, Some(temp.path()), Some(Default::default())).unwrap();

    // Assert
    assert_eq!(settings.orphans, OrphanPolicy::Root);
    assert_eq!(settings.keys.primary_key, "code");
    assert_eq!(settings.keys.parent_key, "pId");
    let options = settings.convert_options().unwrap();
    assert_eq!(options.root, NodeKey::from(0));
}

#[test]
fn given_no_local_config_when_loading_then_defaults() {
    let temp = TempDir::new().unwrap();

    let settings = Settings::load_layers(None, Some(temp.path()), Some(Default::default())).unwrap();

    assert_eq!(settings.keys.primary_key, "id");
    assert_eq!(settings.root, "null");
}

#[test]
fn given_malformed_local_config_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(local_config_path(temp.path()), "orphans = [").unwrap();

    let result = Settings::load_layers(None, Some(temp.path()), Some(Default::default()));

    assert!(result.is_err());
}

#[test]
fn given_global_and_local_config_when_loading_then_local_wins() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let global = temp.path().join("global.toml");
    fs::write(&global, "compact = true\nmax_depth = 8\n[keys]\nprimary_key = \"gid\"\n").unwrap();
    fs::write(local_config_path(temp.path()), "[keys]\nprimary_key = \"lid\"\n").unwrap();

    // Act
    let settings =
        Settings::load_layers(Some(&global), Some(temp.path()), Some(Default::default())).unwrap();

    // Assert
    assert!(settings.compact);
    assert_eq!(settings.max_depth, 8);
    assert_eq!(settings.keys.primary_key, "lid");
}
