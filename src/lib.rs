//! chore - a small recipe runner for development commands
//!
//! A project names a handful of recipes (build, test, fmt, lint and an
//! aggregate `verify`) and runs them by name. Recipes run one at a time;
//! the first failing command stops the run and its exit code becomes the
//! exit code of `chore`.
//!
//! # Example
//!
//! ```toml
//! # chore.toml
//!
//! [recipes.default]
//! depends = ["build"]
//!
//! [recipes.build]
//! desc = "Compile the project"
//! run = ["cargo build"]
//!
//! [recipes.lint]
//! run = ["cargo clippy --all-targets -- -D warnings"]
//! deny_warnings = true
//!
//! [recipes.verify]
//! depends = ["build", "lint"]
//! ```
//!
//! Without a recipe file the same standard table is built in.
//!
//! # Library Usage
//!
//! ```rust,ignore
//! use chore::{Config, Executor, ExecutorConfig, RecipeGraph};
//!
//! #[tokio::main]
//! async fn main() -> chore::Result<()> {
//!     let (config, _) = Config::load(None)?;
//!     let graph = RecipeGraph::from_config(&config)?;
//!
//!     let executor = Executor::new(config, ExecutorConfig::default());
//!     executor.run(&graph, &["verify"]).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;

pub use config::{Config, Recipe};
pub use error::{ChoreError, Result};
pub use executor::{Executor, ExecutorConfig, RecipeResult};
pub use graph::{RecipeGraph, RecipeNode};
