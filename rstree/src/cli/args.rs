//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::domain::{DuplicatePolicy, OrphanPolicy};

/// Convert flat parent-referencing JSON records into nested trees and look up node paths
#[derive(Parser, Debug)]
#[command(name = "rstree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output to stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory searched for .rstree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Overrides for configured conversion settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Field holding the node key
    #[arg(long = "id", value_name = "FIELD")]
    pub primary_key: Option<String>,

    /// Field holding the parent key
    #[arg(long = "pid", value_name = "FIELD")]
    pub parent_key: Option<String>,

    /// Field receiving nested children
    #[arg(long = "children", value_name = "FIELD")]
    pub children_key: Option<String>,

    /// Parent key of top-level records, as JSON literal (e.g. null, 0, '"root"')
    #[arg(long, value_name = "JSON")]
    pub root: Option<String>,

    /// Records with unknown parents: drop, root, error
    #[arg(long, value_name = "POLICY")]
    pub orphans: Option<OrphanPolicy>,

    /// Repeated keys: replace, error
    #[arg(long, value_name = "POLICY")]
    pub duplicates: Option<DuplicatePolicy>,

    /// Deepest tree printed as nested output (0: unlimited)
    #[arg(long, value_name = "LEVELS")]
    pub max_depth: Option<usize>,

    /// Print single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert flat records to nested trees
    Build {
        /// Flat JSON input (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Print the path from a root to a node
    Path {
        /// Key of the node to find
        target: String,

        /// JSON input (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Input is flat records, convert before searching
        #[arg(long)]
        flat: bool,

        /// Parse TARGET as JSON literal instead of a string (e.g. 12, null)
        #[arg(long)]
        json_target: bool,

        /// Print only the keys, joined by " > "
        #[arg(long)]
        keys_only: bool,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Convert nested trees to flat records
    Flatten {
        /// Nested JSON input (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Show flat records as a text tree
    Show {
        /// Flat JSON input (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Field used as node label (default: node key)
        #[arg(long, value_name = "FIELD")]
        label: Option<String>,

        /// Print node count, depth and leaf count
        #[arg(long)]
        stats: bool,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Show effective settings
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
