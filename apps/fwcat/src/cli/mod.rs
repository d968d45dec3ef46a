//! # fwcat CLI Module
//!
//! This module implements the CLI interface for fwcat.
//!
//! ## Available Commands
//!
//! - `list` - List definitions
//! - `show` - Show one resolved definition
//! - `check` - Resolve the catalog and report problems
//! - `classify` - Show the install strategy for a version token
//! - `setup` - Install one framework
//! - `install` - Install many frameworks concurrently
//! - `status` - Show the latest ledger record per framework
//! - `history` - Show every ledger record of one framework
//! - `export` - Write the fully resolved catalog

mod commands;

use crate::install::SetupMode;
use clap::{Parser, Subcommand};
use fwcat_core::CatalogError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// fwcat - framework catalog & installer
///
/// Resolves layered framework definitions and installs each framework
/// with the strategy its version selects.
#[derive(Parser, Debug)]
#[command(name = "fwcat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Definition files, later files override earlier ones
    #[arg(
        short = 'd',
        long = "definitions",
        global = true,
        default_value = "frameworks.toml"
    )]
    pub definitions: Vec<PathBuf>,

    /// Config file (default: fwcat.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of working trees and the installation ledger
    #[arg(long, global = true)]
    pub work_root: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List definitions (concrete only unless --all)
    List {
        /// Include abstract definitions
        #[arg(short, long)]
        all: bool,
    },

    /// Show one fully resolved definition
    Show {
        /// Definition name
        name: String,
    },

    /// Resolve the whole catalog and report errors
    Check,

    /// Show the install strategy selected by a version token
    Classify {
        /// Version token (empty, latest, stable, 1.2.3, a branch or commit)
        token: String,
    },

    /// Install one framework
    Setup {
        /// Definition name
        name: String,

        /// Version token
        #[arg(default_value = "stable")]
        version: String,

        /// Source repository (default: the definition's project)
        #[arg(long)]
        repo: Option<String>,

        /// Package to install (default: the definition's module)
        #[arg(long)]
        package: Option<String>,

        /// Setup mode
        #[arg(short, long, value_enum, default_value_t = SetupMode::Auto)]
        mode: SetupMode,
    },

    /// Install many frameworks (all concrete definitions if no names are given)
    Install {
        /// Definition names
        names: Vec<String>,

        /// Version token for every install (default: each definition's version)
        #[arg(long)]
        version: Option<String>,

        /// Setup mode
        #[arg(short, long, value_enum, default_value_t = SetupMode::Auto)]
        mode: SetupMode,

        /// Concurrent installs (default: from config)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show the latest installed version per framework
    Status {
        /// Definition names (default: all concrete definitions)
        names: Vec<String>,
    },

    /// Show every recorded install of one framework
    History {
        /// Definition name
        name: String,
    },

    /// Export the resolved catalog with every field explicit
    Export {
        /// Output file path (.toml, .json, .yaml)
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CatalogError> {
    let json_mode = cli.json_mode;
    let context = Context::from_cli(&cli);

    match cli.command {
        Some(Commands::List { all }) => cmd_list(&context, json_mode, all),
        Some(Commands::Show { name }) => cmd_show(&context, json_mode, &name),
        Some(Commands::Check) => cmd_check(&context, json_mode),
        Some(Commands::Classify { token }) => cmd_classify(json_mode, &token),
        Some(Commands::Setup {
            name,
            version,
            repo,
            package,
            mode,
        }) => {
            let request = crate::install::InstallRequest {
                version: Some(version),
                repo,
                package,
                mode,
            };
            cmd_setup(&context, json_mode, &name, request).await
        }
        Some(Commands::Install {
            names,
            version,
            mode,
            jobs,
        }) => cmd_install(&context, json_mode, &names, version, mode, jobs).await,
        Some(Commands::Status { names }) => cmd_status(&context, json_mode, &names),
        Some(Commands::History { name }) => cmd_history(&context, json_mode, &name),
        Some(Commands::Export { output }) => cmd_export(&context, &output),
        None => {
            // No subcommand - list by default
            cmd_list(&context, json_mode, false)
        }
    }
}
