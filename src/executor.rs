//! Recipe execution engine
//!
//! Runs the planned recipes strictly one after another. Each command is
//! awaited to completion before the next starts, and the first failure halts
//! the whole run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use console::style;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::{Config, Recipe};
use crate::error::{ChoreError, Result};
use crate::graph::{RecipeGraph, RecipeNode};

/// Result of running a single recipe
#[derive(Debug)]
pub struct RecipeResult {
    pub name: String,
    pub duration: Duration,
    /// Number of commands the recipe itself ran (dependencies excluded)
    pub commands: usize,
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Dry run mode (don't execute, just show plan)
    pub dry_run: bool,
    /// Working directory recipes are resolved against
    pub cwd: PathBuf,
    /// Force shell mode for every command
    pub shell: bool,
    /// Suppress command echo and status lines
    pub quiet: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            cwd: std::env::current_dir().unwrap_or_default(),
            shell: false,
            quiet: false,
        }
    }
}

/// Recipe executor
pub struct Executor {
    config: Config,
    exec_config: ExecutorConfig,
}

impl Executor {
    /// Create a new executor
    pub fn new(config: Config, exec_config: ExecutorConfig) -> Self {
        Self {
            config,
            exec_config,
        }
    }

    /// Run the named recipes and everything they depend on
    pub async fn run<S: AsRef<str>>(
        &self,
        graph: &RecipeGraph,
        names: &[S],
    ) -> Result<Vec<RecipeResult>> {
        let plan = graph.execution_order(names)?;

        if self.exec_config.dry_run {
            Self::print_dry_run(&plan);
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(plan.len());

        for node in plan {
            match self.run_recipe(node).await {
                Ok(result) => {
                    // Aggregate recipes only stand for their dependencies
                    if result.commands > 0 {
                        self.print_recipe_result(&result.name, Some(result.duration));
                    }
                    results.push(result);
                }
                Err(e) => {
                    self.print_recipe_result(&node.name, None);
                    return Err(e);
                }
            }
        }

        self.print_summary(&results);
        Ok(results)
    }

    /// Run the commands of a single recipe, in order
    async fn run_recipe(&self, node: &RecipeNode) -> Result<RecipeResult> {
        let start = Instant::now();
        let recipe = &node.recipe;
        let env = self.config.recipe_env(recipe);

        let cwd = match &recipe.cwd {
            Some(dir) => self.exec_config.cwd.join(dir),
            None => self.exec_config.cwd.clone(),
        };

        tracing::debug!(recipe = %node.name, cwd = %cwd.display(), "running recipe");

        for cmd in &recipe.run {
            self.run_command(&node.name, recipe, cmd, &env, &cwd).await?;
        }

        Ok(RecipeResult {
            name: node.name.clone(),
            duration: start.elapsed(),
            commands: recipe.run.len(),
        })
    }

    /// Run one command to completion
    async fn run_command(
        &self,
        recipe_name: &str,
        recipe: &Recipe,
        cmd: &str,
        env: &HashMap<String, String>,
        cwd: &Path,
    ) -> Result<()> {
        if self.config.settings.echo && !self.exec_config.quiet {
            eprintln!("{} {}", style("$").dim(), style(cmd).bold());
        }

        let use_shell = self.exec_config.shell || self.config.uses_shell(recipe);
        let mut command = self.build_command(cmd, use_shell, env, cwd)?;

        command.current_dir(cwd).envs(env).kill_on_drop(true);

        // A timed-out command is killed together with anything it started
        #[cfg(unix)]
        if recipe.timeout.is_some() {
            command.process_group(0);
        }

        if recipe.deny_warnings {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        tracing::debug!(recipe = recipe_name, command = cmd, shell = use_shell, "spawning");

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ChoreError::CommandNotFound {
                command: cmd.to_string(),
            },
            _ => ChoreError::Io(e),
        })?;
        let pid = child.id();

        let mut readers: Vec<JoinHandle<std::io::Result<usize>>> = if recipe.deny_warnings {
            let out = child
                .stdout
                .take()
                .map(|s| spawn_scanner(s, recipe.warning_markers.clone(), false));
            let err = child
                .stderr
                .take()
                .map(|s| spawn_scanner(s, recipe.warning_markers.clone(), true));
            vec![out, err].into_iter().flatten().collect()
        } else {
            Vec::new()
        };

        let outcome = match recipe.timeout {
            Some(seconds) => timeout(
                Duration::from_secs(seconds),
                wait_and_scan(&mut child, &mut readers),
            )
            .await
            .ok(),
            None => Some(wait_and_scan(&mut child, &mut readers).await),
        };

        let (status, warnings) = match outcome {
            Some(finished) => finished?,
            None => {
                tracing::debug!(recipe = recipe_name, command = cmd, "timed out, killing");
                for reader in &readers {
                    reader.abort();
                }
                kill_process_group(pid);
                // Already reaped when only the output readers were still pending
                let _ = child.kill().await;

                return Err(ChoreError::Timeout {
                    recipe: recipe_name.to_string(),
                    command: cmd.to_string(),
                    seconds: recipe.timeout.unwrap_or_default(),
                });
            }
        };

        check_status(recipe_name, cmd, status)?;

        if warnings > 0 {
            return Err(ChoreError::WarningsDenied {
                recipe: recipe_name.to_string(),
                command: cmd.to_string(),
                count: warnings,
            });
        }

        Ok(())
    }

    /// Build the process for a command, through the shell or directly
    fn build_command(
        &self,
        cmd: &str,
        use_shell: bool,
        env: &HashMap<String, String>,
        cwd: &Path,
    ) -> Result<Command> {
        if use_shell {
            let default_shell = if cfg!(windows) { "cmd" } else { "sh" };
            let shell = self
                .config
                .settings
                .shell
                .as_deref()
                .unwrap_or(default_shell);
            let flag = if shell.ends_with("cmd") || shell.ends_with("cmd.exe") {
                "/C"
            } else {
                "-c"
            };

            let mut c = Command::new(shell);
            c.arg(flag).arg(cmd);
            return Ok(c);
        }

        let parts: Vec<String> = Self::parse_command(cmd)
            .iter()
            .map(|part| expand_vars(part, env))
            .collect();

        let (program, args) = parts.split_first().ok_or_else(|| ChoreError::CommandNotFound {
            command: cmd.to_string(),
        })?;

        let search_path = env
            .get("PATH")
            .map(std::ffi::OsString::from)
            .or_else(|| std::env::var_os("PATH"));
        let resolved = which::which_in(program, search_path, cwd).map_err(|_| {
            ChoreError::CommandNotFound {
                command: program.clone(),
            }
        })?;

        let mut c = Command::new(resolved);
        c.args(args);
        Ok(c)
    }

    /// Parse a command string into parts
    fn parse_command(cmd: &str) -> Vec<String> {
        // Simple shell-like parsing (handles quotes)
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        let mut quote: Option<char> = None;

        for c in cmd.chars() {
            match (quote, c) {
                (None, '"' | '\'') => {
                    quote = Some(c);
                    in_word = true;
                }
                (Some(q), c) if c == q => quote = None,
                (None, c) if c.is_whitespace() => {
                    if in_word {
                        parts.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_word = true;
                }
            }
        }

        if in_word {
            parts.push(current);
        }

        parts
    }

    /// Print dry-run execution plan
    fn print_dry_run(plan: &[&RecipeNode]) {
        println!("{}", style("Execution plan (dry run):").bold().cyan());
        println!();

        for (i, node) in plan.iter().enumerate() {
            println!(
                "{} {}",
                style(format!("{}.", i + 1)).bold(),
                style(&node.name).cyan().bold()
            );

            for cmd in &node.recipe.run {
                println!("    {} {}", style("→").dim(), cmd);
            }
        }
    }

    /// Print the status line of a single recipe; `None` marks a failure
    fn print_recipe_result(&self, name: &str, duration: Option<Duration>) {
        if self.exec_config.quiet {
            return;
        }

        match duration {
            Some(duration) => eprintln!(
                "{} {} {}",
                style("✓").green(),
                style(name).bold(),
                style(format!("{:.2}s", duration.as_secs_f64())).dim()
            ),
            None => eprintln!("{} {}", style("✗").red(), style(name).bold()),
        }
    }

    /// Print execution summary
    fn print_summary(&self, results: &[RecipeResult]) {
        let ran: Vec<&RecipeResult> = results.iter().filter(|r| r.commands > 0).collect();
        if self.exec_config.quiet || ran.len() < 2 {
            return;
        }

        let total: Duration = ran.iter().map(|r| r.duration).sum();
        let commands: usize = ran.iter().map(|r| r.commands).sum();

        eprintln!(
            "{} {} recipes ({} commands) completed in {:.2}s",
            style("✓").green().bold(),
            ran.len(),
            commands,
            total.as_secs_f64()
        );
    }
}

/// Map a finished process status to the run outcome
fn check_status(recipe: &str, command: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(ChoreError::CommandFailed {
            recipe: recipe.to_string(),
            command: command.to_string(),
            code,
        }),
        None => Err(ChoreError::CommandKilled {
            recipe: recipe.to_string(),
            command: command.to_string(),
        }),
    }
}

/// Expand `$VAR` and `${VAR}` using the recipe env, then the process env
fn expand_vars(part: &str, env: &HashMap<String, String>) -> String {
    shellexpand::env_with_context_no_errors(part, |var: &str| {
        env.get(var).cloned().or_else(|| std::env::var(var).ok())
    })
    .into_owned()
}

/// Wait for the process to exit and for its output to be drained
async fn wait_and_scan(
    child: &mut Child,
    readers: &mut [JoinHandle<std::io::Result<usize>>],
) -> Result<(ExitStatus, usize)> {
    let status = child.wait().await?;

    let mut warnings = 0;
    for reader in readers.iter_mut() {
        warnings += reader
            .await
            .map_err(|e| ChoreError::Io(std::io::Error::other(e.to_string())))??;
    }

    Ok((status, warnings))
}

/// Kill the process group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };

    // The child was spawned with process_group(0), so its pid is the group id
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Whether an output line reports a warning
fn is_warning(line: &str, markers: &[String]) -> bool {
    let plain = console::strip_ansi_codes(line);
    let plain = plain.trim_start();
    markers.iter().any(|marker| plain.starts_with(marker.as_str()))
}

/// Echo a piped stream line by line and count the warnings in it
fn spawn_scanner<R>(
    stream: R,
    markers: Vec<String>,
    to_stderr: bool,
) -> JoinHandle<std::io::Result<usize>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut count = 0;

        while let Some(line) = lines.next_line().await? {
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }

            if is_warning(&line, &markers) {
                count += 1;
            }
        }

        Ok(count)
    })
}
