//! Recipe file parsing for chore.toml
//!
//! Handles loading and validating the recipe table. When no file is found the
//! built-in standard table is used instead.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ChoreError, Result};

/// Recipe file names to search for, in order
pub const CONFIG_FILES: &[&str] = &["chore.toml", "Chore.toml", ".chore.toml"];

/// Names taken by subcommands; a recipe with one of them could not be run by name
pub const RESERVED_NAMES: &[&str] = &["run", "list", "init", "check", "help"];

/// The standard recipe table, written by `chore init` and used when no
/// recipe file exists.
pub const DEFAULT_TEMPLATE: &str = r#"# chore.toml - development recipes
#
# Run `chore <recipe>`; `chore` alone runs `default`.

[env]
# CARGO_TERM_COLOR = "always"

[settings]
# shell_mode = false        # Run every command through the shell
# echo = true               # Print each command before running it

[recipes.default]
desc = "Build the project"
depends = ["build"]

[recipes.build]
desc = "Compile the project"
run = ["cargo build"]

[recipes.test]
desc = "Run the test suite"
run = ["cargo test"]

[recipes.fmt]
desc = "Check formatting without modifying files"
run = ["cargo fmt --all -- --check"]

[recipes.lint]
desc = "Run clippy, failing on any warning"
run = ["cargo clippy --all-targets -- -D warnings"]
deny_warnings = true

[recipes.verify]
desc = "Build, test, check formatting and lint"
depends = ["build", "test", "fmt", "lint"]
"#;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Global environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Recipe definitions
    #[serde(default)]
    pub recipes: BTreeMap<String, Recipe>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global settings for chore behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Shell program used in shell mode (defaults to `sh`, or `cmd` on Windows)
    #[serde(default)]
    pub shell: Option<String>,

    /// Run commands through the shell unless a recipe says otherwise
    #[serde(default)]
    pub shell_mode: bool,

    /// Print each command before running it
    #[serde(default = "default_true")]
    pub echo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: None,
            shell_mode: false,
            echo: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_warning_markers() -> Vec<String> {
    vec!["warning:".to_string(), "warning[".to_string()]
}

/// Configuration for a single recipe
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Human-readable description
    #[serde(default)]
    pub desc: Option<String>,

    /// Commands to run, in order
    #[serde(default)]
    pub run: Vec<String>,

    /// Recipes that run before this one, in order
    #[serde(default)]
    pub depends: Vec<String>,

    /// Recipe-specific environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for this recipe
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Use shell to execute commands
    #[serde(default)]
    pub shell: Option<bool>,

    /// Fail when the output contains a warning, even on a zero exit status
    #[serde(default)]
    pub deny_warnings: bool,

    /// Line prefixes that count as a warning when `deny_warnings` is set
    #[serde(default = "default_warning_markers")]
    pub warning_markers: Vec<String>,

    /// Timeout in seconds, per command
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Where the recipe table came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Builtin => f.write_str("built-in recipes"),
        }
    }
}

impl Config {
    /// Load configuration from the specified path, or search for it.
    ///
    /// An explicit path must exist. Without one, the directory tree is
    /// searched upward and the built-in table is used if nothing is found.
    pub fn load(path: Option<&Path>) -> Result<(Self, Source)> {
        let config_path = match path {
            Some(p) if p.exists() => p.to_path_buf(),
            Some(p) => {
                return Err(ChoreError::ConfigNotFound {
                    searched: vec![p.to_path_buf()],
                })
            }
            None => match Self::find_config()? {
                Some(found) => found,
                None => {
                    tracing::debug!("no recipe file found, using built-in recipes");
                    return Ok((Self::builtin()?, Source::Builtin));
                }
            },
        };

        tracing::debug!(path = %config_path.display(), "loading recipe file");
        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::parse(&content, &config_path)?;

        Ok((config, Source::File(config_path)))
    }

    /// Parse and validate a recipe table
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| ChoreError::ConfigParse {
            source: e,
            path: path.to_path_buf(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// The standard recipe table
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_TEMPLATE, Path::new("<built-in>"))
    }

    /// Search for a recipe file starting from the current directory
    fn find_config() -> Result<Option<PathBuf>> {
        let mut current = std::env::current_dir()?;

        loop {
            for name in CONFIG_FILES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Ok(Some(candidate));
                }
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        for (name, recipe) in &self.recipes {
            if name.trim().is_empty() {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "Recipe name cannot be empty".to_string(),
                });
            }

            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "Name is reserved for a chore subcommand".to_string(),
                });
            }

            if recipe.run.is_empty() && recipe.depends.is_empty() {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "Recipe must have 'run' commands or 'depends'".to_string(),
                });
            }

            if recipe.run.iter().any(|cmd| cmd.trim().is_empty()) {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "Commands in 'run' cannot be empty".to_string(),
                });
            }

            if recipe.depends.contains(name) {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "Recipe cannot depend on itself".to_string(),
                });
            }

            if recipe.timeout == Some(0) {
                return Err(ChoreError::InvalidRecipe {
                    recipe: name.clone(),
                    reason: "'timeout' must be at least one second".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get a recipe by name
    pub fn get_recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// List all recipe names, sorted
    pub fn recipe_names(&self) -> Vec<&str> {
        self.recipes.keys().map(|s| s.as_str()).collect()
    }

    /// Merge environment variables for a recipe (global + recipe-specific)
    pub fn recipe_env(&self, recipe: &Recipe) -> HashMap<String, String> {
        let mut env = self.env.clone();
        env.extend(recipe.env.clone());
        env
    }

    /// Whether commands of this recipe go through the shell
    pub fn uses_shell(&self, recipe: &Recipe) -> bool {
        recipe.shell.unwrap_or(self.settings.shell_mode)
    }
}
