//! Command dispatch

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use itertools::Itertools;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::convert::{
    build_forest, ensure_depth, find_tree_node_paths, flatten_tree_data, parse_tree_data,
    records_from, to_array, ConvertOptions,
};
use crate::application::io::{read_json, to_json_string, InputSource};
use crate::application::render::{ForestStats, TreeNodeConvert};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConvertArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::NodeKey;

/// Run the parsed command line, writing results to `out`.
pub fn execute_command(cli: &Cli, out: &mut impl Write) -> CliResult<()> {
    let settings = load_settings(cli.config_dir.as_deref())?;
    execute_with_settings(cli, &settings, out)
}

/// Run the parsed command line against already loaded settings.
pub fn execute_with_settings(
    cli: &Cli,
    settings: &Settings,
    out: &mut impl Write,
) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Build { file, convert }) => build(file.as_deref(), settings, convert, out),
        Some(Commands::Path {
            target,
            file,
            flat,
            json_target,
            keys_only,
            convert,
        }) => path(
            target,
            file.as_deref(),
            PathFlags {
                flat: *flat,
                json_target: *json_target,
                keys_only: *keys_only,
            },
            settings,
            convert,
            out,
        ),
        Some(Commands::Flatten { file, convert }) => {
            flatten(file.as_deref(), settings, convert, out)
        }
        Some(Commands::Show {
            file,
            label,
            stats,
            convert,
        }) => show(file.as_deref(), label.as_deref(), *stats, settings, convert, out),
        Some(Commands::Config) => show_config(cli.config_dir.as_deref(), settings, out),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "rstree", out);
            Ok(())
        }
        None => Ok(()),
    }
}

fn load_settings(config_dir: Option<&Path>) -> CliResult<Settings> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(|source| ApplicationError::Io {
            context: "current directory".to_string(),
            source,
        })?,
    };
    Ok(Settings::load(Some(&dir))?)
}

/// Command line flags win over loaded settings.
pub fn apply_overrides(settings: &Settings, args: &ConvertArgs) -> Settings {
    let mut s = settings.clone();
    if let Some(v) = &args.primary_key {
        s.keys.primary_key = v.clone();
    }
    if let Some(v) = &args.parent_key {
        s.keys.parent_key = v.clone();
    }
    if let Some(v) = &args.children_key {
        s.keys.children_key = v.clone();
    }
    if let Some(v) = &args.root {
        s.root = v.clone();
    }
    if let Some(v) = args.orphans {
        s.orphans = v;
    }
    if let Some(v) = args.duplicates {
        s.duplicates = v;
    }
    if let Some(v) = args.max_depth {
        s.max_depth = v;
    }
    s.compact |= args.compact;
    s
}

fn resolve(settings: &Settings, args: &ConvertArgs) -> CliResult<(ConvertOptions, bool)> {
    let effective = apply_overrides(settings, args);
    let options = effective.convert_options()?;
    debug!(?options, "conversion options");
    Ok((options, effective.compact))
}

fn emit(out: &mut impl Write, text: &str) -> CliResult<()> {
    writeln!(out, "{}", text).map_err(|source| {
        CliError::from(ApplicationError::Io {
            context: "write output".to_string(),
            source,
        })
    })
}

fn read_input(file: Option<&Path>) -> CliResult<Value> {
    Ok(read_json(&InputSource::from_arg(file))?)
}

#[instrument(skip(settings, args, out))]
fn build(
    file: Option<&Path>,
    settings: &Settings,
    args: &ConvertArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let (options, compact) = resolve(settings, args)?;
    let tree = parse_tree_data(read_input(file)?, &options).map_err(ApplicationError::from)?;
    emit(out, &to_json_string(&tree, compact)?)
}

#[derive(Debug, Clone, Copy)]
struct PathFlags {
    flat: bool,
    json_target: bool,
    keys_only: bool,
}

#[instrument(skip(settings, args, out))]
fn path(
    target: &str,
    file: Option<&Path>,
    flags: PathFlags,
    settings: &Settings,
    args: &ConvertArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let (options, compact) = resolve(settings, args)?;
    let target = if flags.json_target {
        NodeKey::parse_literal(target).map_err(|e| CliError::InvalidArgs(e.to_string()))?
    } else {
        NodeKey::from(target)
    };

    let input = read_input(file)?;
    let tree = if flags.flat {
        parse_tree_data(input, &options).map_err(ApplicationError::from)?
    } else {
        to_array(input)
    };

    let found = find_tree_node_paths(&tree, &target, &options.keys);
    if found.is_empty() {
        output::warning(&format!("node {} not found", target));
    }

    if flags.keys_only {
        let keys = found
            .iter()
            .map(|node| {
                node.get(&options.keys.primary_key)
                    .and_then(NodeKey::from_value)
                    .map(|k| k.to_string())
                    .unwrap_or_default()
            })
            .join(" > ");
        if !keys.is_empty() {
            emit(out, &keys)?;
        }
        Ok(())
    } else {
        emit(out, &to_json_string(&found, compact)?)
    }
}

#[instrument(skip(settings, args, out))]
fn flatten(
    file: Option<&Path>,
    settings: &Settings,
    args: &ConvertArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let (options, compact) = resolve(settings, args)?;
    let tree = to_array(read_input(file)?);
    let flat =
        flatten_tree_data(&tree, &options.root, &options.keys).map_err(ApplicationError::from)?;
    emit(out, &to_json_string(&flat, compact)?)
}

#[instrument(skip(settings, args, out))]
fn show(
    file: Option<&Path>,
    label: Option<&str>,
    stats: bool,
    settings: &Settings,
    args: &ConvertArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let (options, _) = resolve(settings, args)?;
    let records = records_from(read_input(file)?).map_err(ApplicationError::from)?;
    let forest = build_forest(records, &options).map_err(ApplicationError::from)?;
    ensure_depth(&forest, options.max_depth).map_err(ApplicationError::from)?;

    for tree in forest.to_tree_strings(label) {
        // termtree output already ends with a newline
        emit(out, tree.to_string().trim_end())?;
    }

    if stats {
        let s = ForestStats::of(&forest);
        emit(
            out,
            &format!(
                "nodes: {}\nroots: {}\ndepth: {}\nleaves: {}",
                s.nodes, s.roots, s.depth, s.leaves
            ),
        )?;
    }
    Ok(())
}

fn show_config(
    config_dir: Option<&Path>,
    settings: &Settings,
    out: &mut impl Write,
) -> CliResult<()> {
    let global = global_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<none>".to_string());
    let local = config_dir
        .map(local_config_path)
        .unwrap_or_else(|| PathBuf::from(".rstree.toml"));
    output::header(&format!("global: {}, local: {}", global, local.display()));
    emit(out, settings.to_toml()?.trim_end())
}
