//! chore - run the recipes of a project
//!
//! Named shortcuts for everyday development commands, run one at a time,
//! stopping at the first failure with that command's exit code.

use std::process::ExitCode;

use chore::config::{Source, DEFAULT_TEMPLATE};
use chore::{ChoreError, Config, Executor, ExecutorConfig, RecipeGraph, Result};
use clap::Parser;
use console::style;

mod cli;

use cli::{Cli, Commands, EffectiveCommand, ListFormat};

/// Recipe run when no name is given
const DEFAULT_RECIPE: &str = "default";

#[tokio::main]
async fn main() -> ExitCode {
    // Set up panic handler for nice error messages
    miette::set_panic_hook();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(cwd) = &cli.cwd {
        std::env::set_current_dir(cwd)?;
    }

    match cli.effective_command() {
        EffectiveCommand::Subcommand(cmd) => run_command(cmd, &cli).await,
        EffectiveCommand::RunRecipes(recipes) => run_recipes(recipes, false, false, &cli).await,
        EffectiveCommand::Default => {
            let (config, _) = Config::load(cli.config.as_deref())?;
            let graph = RecipeGraph::from_config(&config)?;

            if graph.has_recipe(DEFAULT_RECIPE) {
                run_recipes(&[DEFAULT_RECIPE.to_string()], false, false, &cli).await
            } else {
                print_recipe_list(&graph, ListFormat::Table, false);
                Ok(())
            }
        }
    }
}

async fn run_command(cmd: &Commands, cli: &Cli) -> Result<()> {
    match cmd {
        Commands::Run {
            recipes,
            dry_run,
            shell,
        } => run_recipes(recipes, *dry_run, *shell, cli).await,

        Commands::List { format, deps } => {
            let (config, _) = Config::load(cli.config.as_deref())?;
            let graph = RecipeGraph::from_config(&config)?;
            print_recipe_list(&graph, *format, *deps);
            Ok(())
        }

        Commands::Init { force } => init_config(*force),

        Commands::Check => {
            let (config, source) = Config::load(cli.config.as_deref())?;
            let graph = RecipeGraph::from_config(&config)?;

            println!(
                "{} {} {} valid ({} recipes)",
                style("✓").green(),
                source,
                if source == Source::Builtin { "are" } else { "is" },
                graph.recipe_names().count()
            );
            Ok(())
        }
    }
}

async fn run_recipes(recipes: &[String], dry_run: bool, shell: bool, cli: &Cli) -> Result<()> {
    let (config, source) = Config::load(cli.config.as_deref())?;
    tracing::debug!(%source, "recipes loaded");

    let graph = RecipeGraph::from_config(&config)?;

    let exec_config = ExecutorConfig {
        dry_run,
        cwd: std::env::current_dir()?,
        shell,
        quiet: cli.quiet,
    };

    let executor = Executor::new(config, exec_config);
    executor.run(&graph, recipes).await?;

    Ok(())
}

fn print_recipe_list(graph: &RecipeGraph, format: ListFormat, show_deps: bool) {
    match format {
        ListFormat::Table => {
            println!("{}", style("Available recipes:").bold());
            println!();

            let max_name_len = graph.recipe_names().map(|n| n.len()).max().unwrap_or(0);

            for name in graph.recipe_names() {
                let Some(node) = graph.get_recipe(name) else {
                    continue;
                };
                let desc = node.recipe.desc.as_deref().unwrap_or("");

                print!(
                    "  {}{}  {}",
                    style(name).cyan().bold(),
                    " ".repeat(max_name_len - name.len()),
                    style(desc).dim()
                );

                if show_deps {
                    let deps = graph.dependencies(name).unwrap_or_default();
                    if !deps.is_empty() {
                        print!(
                            " {}",
                            style(format!("[deps: {}]", deps.join(", "))).yellow().dim()
                        );
                    }
                }

                println!();
            }
        }

        ListFormat::Json => {
            let mut recipes = serde_json::Map::new();
            for name in graph.recipe_names() {
                if let Some(node) = graph.get_recipe(name) {
                    let mut obj = serde_json::Map::new();
                    if let Some(desc) = &node.recipe.desc {
                        obj.insert("description".to_string(), serde_json::json!(desc));
                    }
                    obj.insert("run".to_string(), serde_json::json!(node.recipe.run));
                    if show_deps {
                        obj.insert("depends".to_string(), serde_json::json!(node.recipe.depends));
                    }
                    recipes.insert(name.to_string(), serde_json::Value::Object(obj));
                }
            }
            println!("{}", serde_json::Value::Object(recipes));
        }

        ListFormat::Plain => {
            for name in graph.recipe_names() {
                println!("{}", name);
            }
        }
    }
}

fn init_config(force: bool) -> Result<()> {
    let path = std::path::Path::new("chore.toml");

    if path.exists() && !force {
        return Err(ChoreError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "chore.toml already exists (use --force to overwrite)",
        )));
    }

    std::fs::write(path, DEFAULT_TEMPLATE)?;

    println!(
        "{} Created {}",
        style("✓").green(),
        style("chore.toml").bold()
    );

    Ok(())
}
