//! CLI command definitions and handling
//!
//! Uses `clap` derive API for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// chore - run the recipes of a project
#[derive(Parser, Debug)]
#[command(name = "chore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a chore.toml recipe file
    #[arg(short, long, global = true, env = "CHORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress command echo and status lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Working directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Recipes to run (shorthand for `chore run <recipe>...`)
    pub recipes: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more recipes
    Run {
        /// Recipes to run, in order
        #[arg(required = true)]
        recipes: Vec<String>,

        /// Show execution plan without running
        #[arg(long)]
        dry_run: bool,

        /// Use shell to execute commands
        #[arg(long)]
        shell: bool,
    },

    /// List available recipes
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: ListFormat,

        /// Show recipe dependencies
        #[arg(long)]
        deps: bool,
    },

    /// Write the standard chore.toml
    Init {
        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the recipe file
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
    Plain,
}

impl Cli {
    /// Get the effective command, treating bare recipe names as `run <recipe>`
    pub fn effective_command(&self) -> EffectiveCommand<'_> {
        if let Some(cmd) = &self.command {
            EffectiveCommand::Subcommand(cmd)
        } else if !self.recipes.is_empty() {
            EffectiveCommand::RunRecipes(&self.recipes)
        } else {
            EffectiveCommand::Default
        }
    }
}

pub enum EffectiveCommand<'a> {
    Subcommand(&'a Commands),
    RunRecipes(&'a [String]),
    /// No recipe given: run `default`, or list recipes when it is missing
    Default,
}
