//! Error types for chore
//!
//! Uses `miette` for pretty error reporting with help text.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chore operations
#[derive(Error, Diagnostic, Debug)]
pub enum ChoreError {
    #[error("Recipe file not found")]
    #[diagnostic(
        code(chore::config::not_found),
        help("Create a chore.toml with `chore init`, or point to one with --config")
    )]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Failed to parse {}", .path.display())]
    #[diagnostic(code(chore::config::parse))]
    ConfigParse {
        #[source]
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Recipe '{name}' not found")]
    #[diagnostic(code(chore::recipe::not_found))]
    RecipeNotFound {
        name: String,
        available: Vec<String>,
        #[help]
        suggestion: Option<String>,
    },

    #[error("Circular dependency detected: {cycle}")]
    #[diagnostic(
        code(chore::recipe::cycle),
        help("Check the 'depends' field in your recipe definitions")
    )]
    CyclicDependency { cycle: String },

    #[error("Invalid recipe '{recipe}': {reason}")]
    #[diagnostic(code(chore::config::invalid_recipe))]
    InvalidRecipe { recipe: String, reason: String },

    #[error("Recipe '{recipe}' failed: `{command}` exited with code {code}")]
    #[diagnostic(code(chore::exec::failed))]
    CommandFailed {
        recipe: String,
        command: String,
        code: i32,
    },

    #[error("Recipe '{recipe}' failed: `{command}` was terminated by a signal")]
    #[diagnostic(code(chore::exec::signal))]
    CommandKilled { recipe: String, command: String },

    #[error("Recipe '{recipe}' failed: `{command}` reported {count} warning(s)")]
    #[diagnostic(
        code(chore::exec::warnings),
        help("This recipe denies warnings; fix them or unset `deny_warnings`")
    )]
    WarningsDenied {
        recipe: String,
        command: String,
        count: usize,
    },

    #[error("Recipe '{recipe}' timed out after {seconds}s running `{command}`")]
    #[diagnostic(code(chore::exec::timeout))]
    Timeout {
        recipe: String,
        command: String,
        seconds: u64,
    },

    #[error("Command not found: {command}")]
    #[diagnostic(
        code(chore::exec::command_not_found),
        help("Ensure the command is installed and in your PATH")
    )]
    CommandNotFound { command: String },

    #[error("I/O error")]
    #[diagnostic(code(chore::io))]
    Io(#[from] std::io::Error),
}

impl ChoreError {
    /// Process exit code to report for this error.
    ///
    /// A failing command passes its own status through; everything else is 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ChoreError::CommandFailed { code, .. } => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// Result type alias for chore operations
pub type Result<T> = std::result::Result<T, ChoreError>;
