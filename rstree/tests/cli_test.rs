//! Command execution against in-memory output

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};
use tempfile::TempDir;

use rstree::cli::{execute_with_settings, Cli};
use rstree::config::Settings;
use rstree::exitcode;
use rstree::util::testing;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        testing::init_test_setup();
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn file(&self, name: &str, content: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content.to_string()).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Result<String, i32> {
        let dir = self.dir.path().to_string_lossy().to_string();
        let mut argv = vec!["rstree", "-C", dir.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        // no global file, no process environment
        let settings =
            Settings::load_layers(None, Some(self.dir.path()), Some(Default::default())).unwrap();
        let mut out = Vec::new();
        execute_with_settings(&cli, &settings, &mut out).map_err(|e| e.exit_code())?;
        Ok(String::from_utf8(out).unwrap())
    }
}

fn flat() -> Value {
    json!([
        {"id": "1", "pId": null, "name": "one"},
        {"id": "11", "pId": "1", "name": "eleven"},
        {"id": "2", "pId": null, "name": "two"}
    ])
}

#[test]
fn given_flat_file_when_build_then_prints_nested_json() {
    // Arrange
    let fx = Fixture::new();
    let input = fx.file("flat.json", &flat());

    // Act
    let out = fx.run(&["build", input.to_str().unwrap()]).unwrap();

    // Assert
    let tree: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(tree[0]["children"][0]["id"], json!("11"));
    assert_eq!(tree[1]["id"], json!("2"));
}

#[test]
fn given_compact_flag_when_build_then_single_line() {
    let fx = Fixture::new();
    let input = fx.file("flat.json", &flat());

    let out = fx.run(&["build", input.to_str().unwrap(), "--compact"]).unwrap();

    assert_eq!(out.trim_end().lines().count(), 1);
}

#[test]
fn given_flat_input_when_path_keys_only_then_joined_keys() {
    let fx = Fixture::new();
    let input = fx.file("flat.json", &flat());

    let out = fx
        .run(&["path", "11", input.to_str().unwrap(), "--flat", "--keys-only"])
        .unwrap();

    assert_eq!(out.trim_end(), "1 > 11");
}

#[test]
fn given_unknown_target_when_path_then_empty_array() {
    let fx = Fixture::new();
    let input = fx.file("flat.json", &flat());

    let out = fx
        .run(&["path", "99", input.to_str().unwrap(), "--flat", "--compact"])
        .unwrap();

    assert_eq!(out.trim_end(), "[]");
}

#[test]
fn given_numeric_keys_when_path_with_json_target_then_found() {
    // Arrange
    let fx = Fixture::new();
    let input = fx.file(
        "tree.json",
        &json!([{"id": 1, "children": [{"id": 2}]}]),
    );

    // Act
    let as_string = fx
        .run(&["path", "2", input.to_str().unwrap(), "--keys-only"])
        .unwrap();
    let as_number = fx
        .run(&["path", "2", input.to_str().unwrap(), "--keys-only", "--json-target"])
        .unwrap();

    // Assert
    assert_eq!(as_string, "");
    assert_eq!(as_number.trim_end(), "1 > 2");
}

#[test]
fn given_invalid_json_target_when_path_then_usage_error() {
    let fx = Fixture::new();
    let input = fx.file("tree.json", &json!([]));

    let code = fx
        .run(&["path", "{", input.to_str().unwrap(), "--json-target"])
        .unwrap_err();

    assert_eq!(code, exitcode::USAGE);
}

#[test]
fn given_nested_file_when_flatten_then_parent_keys_set() {
    // Arrange
    let fx = Fixture::new();
    let input = fx.file(
        "tree.json",
        &json!([{"id": "a", "children": [{"id": "b"}]}]),
    );

    // Act
    let out = fx.run(&["flatten", input.to_str().unwrap()]).unwrap();

    // Assert
    let records: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        records,
        json!([{"id": "a", "pId": null}, {"id": "b", "pId": "a"}])
    );
}

#[test]
fn given_flat_file_when_show_with_stats_then_tree_and_counts() {
    let fx = Fixture::new();
    let input = fx.file("flat.json", &flat());

    let out = fx
        .run(&["show", input.to_str().unwrap(), "--label", "name", "--stats"])
        .unwrap();

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "one");
    assert!(lines[1].ends_with("eleven"));
    assert_eq!(lines[2], "two");
    assert!(out.contains("nodes: 3"));
    assert!(out.contains("depth: 2"));
    assert!(out.contains("leaves: 2"));
}

#[test]
fn given_missing_file_when_build_then_noinput() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("nope.json");

    let code = fx.run(&["build", missing.to_str().unwrap()]).unwrap_err();

    assert_eq!(code, exitcode::NOINPUT);
}

#[test]
fn given_malformed_json_when_build_then_dataerr() {
    let fx = Fixture::new();
    let path = fx.dir.path().join("bad.json");
    fs::write(&path, "[{").unwrap();

    let code = fx.run(&["build", path.to_str().unwrap()]).unwrap_err();

    assert_eq!(code, exitcode::DATAERR);
}

#[test]
fn given_duplicates_error_flag_when_build_then_dataerr() {
    let fx = Fixture::new();
    let input = fx.file("dup.json", &json!([{"id": 1}, {"id": 1}]));

    let code = fx
        .run(&["build", input.to_str().unwrap(), "--duplicates", "error"])
        .unwrap_err();

    assert_eq!(code, exitcode::DATAERR);
}

#[test]
fn given_local_config_when_config_command_then_effective_toml() {
    // Arrange
    let fx = Fixture::new();
    fs::write(
        fx.dir.path().join(".rstree.toml"),
        "[keys]\nparent_key = \"parent\"\n",
    )
    .unwrap();

    // Act
    let out = fx.run(&["config"]).unwrap();

    // Assert
    assert!(out.contains("parent_key = \"parent\""));
}

#[test]
fn given_local_config_key_names_when_build_then_flag_overrides() {
    // Arrange
    let fx = Fixture::new();
    fs::write(
        fx.dir.path().join(".rstree.toml"),
        "[keys]\nparent_key = \"parent\"\n",
    )
    .unwrap();
    let input = fx.file(
        "flat.json",
        &json!([{"id": 1, "up": null}, {"id": 2, "up": 1}]),
    );

    // Act
    let out = fx
        .run(&["build", input.to_str().unwrap(), "--pid", "up", "--compact"])
        .unwrap();

    // Assert
    let tree: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(tree, json!([{"id": 1, "up": null, "children": [{"id": 2, "up": 1}]}]));
}

#[test]
fn given_shell_when_completion_then_script_written() {
    let fx = Fixture::new();

    let out = fx.run(&["completion", "bash"]).unwrap();

    assert!(out.contains("rstree"));
}

#[test]
fn given_chain_deeper_than_limit_when_build_then_dataerr() {
    // Arrange
    let fx = Fixture::new();
    let chain: Vec<Value> = (1..=5)
        .map(|i| {
            let parent = if i == 1 { Value::Null } else { json!(i - 1) };
            json!({"id": i, "pId": parent})
        })
        .collect();
    let input = fx.file("chain.json", &Value::Array(chain));
    let path = input.to_str().unwrap();

    // Act
    let capped = fx.run(&["build", path, "--max-depth", "4"]);
    let allowed = fx.run(&["show", path, "--max-depth", "5", "--stats"]);

    // Assert
    assert_eq!(capped.unwrap_err(), exitcode::DATAERR);
    assert!(allowed.unwrap().contains("depth: 5"));
}
