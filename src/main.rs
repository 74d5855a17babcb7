use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::rngs::StdRng;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use retrogit::config::Config;
use retrogit::hook::{HookScript, HookStage, Overwrite};
use retrogit::{RandomJitter, RetroGit, output};

#[derive(Parser)]
#[command(
    name = "retrogit",
    version,
    author = "Ludwig",
    about = "Commit with dates spread across a past time period",
    long_about = "A git wrapper that backdates each new commit to a few days after the previous one, so a burst of work reads as steady progress"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, help = "Path to git repository")]
    repo: Option<PathBuf>,

    #[arg(short, long, help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Skip confirmation prompts")]
    yes: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Show what would be done without making changes")]
    dry_run: bool,

    #[arg(long, env = "RETROGIT_SEED", hide = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run git commit with a backdated timestamp")]
    Commit {
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            help = "Arguments passed through to git commit"
        )]
        args: Vec<String>,
    },

    #[command(about = "Show the date the next commit would receive")]
    Next,

    #[command(about = "Install the pre-commit and post-commit hooks")]
    Install,

    #[command(about = "Remove hooks installed by retrogit")]
    Uninstall,

    #[command(hide = true, about = "Entry point for installed git hooks")]
    Hook {
        #[arg(value_enum)]
        stage: HookStage,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Print the config file location")]
    Path,

    #[command(about = "Write a config file with the default values")]
    Init,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::locate().context("Failed to locate configuration")?,
    };
    let now = Local::now().fixed_offset();

    match &cli.command {
        Commands::Config { action } => {
            handle_config(action, &config_path, cli.yes, cli.dry_run)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Commit { args } => {
            let (retrogit, mut jitter) = start(&cli, &config_path)?;
            let status = retrogit.commit(args, now, &mut jitter, cli.dry_run)?;
            Ok(ExitCode::from(exit_code(status.code())))
        }
        Commands::Next => {
            let (retrogit, mut jitter) = start(&cli, &config_path)?;
            let date = retrogit.next_date(now, &mut jitter)?;
            println!("{}", output::date(&date));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Install => {
            let (retrogit, _) = start(&cli, &config_path)?;
            // Hooks run without our flags or environment, so an explicit
            // config choice has to be written into the shim.
            let recorded = cli.config.clone().or_else(Config::env_override);
            let script = HookScript::current(absolute(recorded)?)?;
            let overwrite = if cli.yes {
                Overwrite::Always
            } else if std::io::stdin().is_terminal() {
                Overwrite::Prompt
            } else {
                Overwrite::Never
            };
            retrogit.install(&script, overwrite, cli.dry_run)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Uninstall => {
            let (retrogit, _) = start(&cli, &config_path)?;
            retrogit.uninstall(cli.dry_run)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Hook { stage } => {
            let (retrogit, mut jitter) = start(&cli, &config_path)?;
            let result = match stage {
                HookStage::PreCommit => retrogit.pre_commit(),
                HookStage::PostCommit => retrogit.post_commit(now, &mut jitter),
            };
            result.context("RetroGit hook failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the config and set up everything a repository command needs.
fn start(cli: &Cli, config_path: &Path) -> Result<(RetroGit, RandomJitter<StdRng>)> {
    let config = Config::load(config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_path.display()
        )
    })?;
    if config.timing.allows_backwards_steps() {
        output::warn("randomness_days is not smaller than interval_days; commits may be dated before their parent");
    }

    let repo_path = match &cli.repo {
        Some(path) => path.clone(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let retrogit = RetroGit::new(repo_path, config)?.verbose(cli.verbose);
    if cli.verbose {
        output::info(&format!("Using config {}", config_path.display()));
    }

    let jitter = match cli.seed {
        Some(seed) => RandomJitter::seeded(seed),
        None => RandomJitter::from_entropy(),
    };
    Ok((retrogit, jitter))
}

/// `git commit` exit status, or 1 when it died without one in `0..=255`.
fn exit_code(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}

fn absolute(path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) if path.is_relative() => Ok(Some(env::current_dir()?.join(path))),
        other => Ok(other),
    }
}

fn handle_config(
    action: &ConfigAction,
    config_path: &Path,
    overwrite: bool,
    dry_run: bool,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(config_path)?;
            let source = if config_path.exists() {
                config_path.display().to_string().cyan()
            } else {
                format!("{} (not found, using defaults)", config_path.display()).yellow()
            };

            println!("Configuration file: {source}");
            println!();
            println!("Timing:");
            println!(
                "  Interval:         {} days",
                config.timing.interval_days.to_string().green()
            );
            println!(
                "  Randomness:       ± {} days",
                config.timing.randomness_days.to_string().green()
            );
            println!(
                "  Initial backdate: {} days",
                config.timing.initial_backdate_days.to_string().green()
            );
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init => {
            if config_path.exists() && !overwrite {
                anyhow::bail!(
                    "{} already exists (use --yes to overwrite)",
                    config_path.display()
                );
            }

            if dry_run {
                output::dry_run_header("Config init preview");
                println!("  Would write defaults to {}", config_path.display());
                return Ok(());
            }

            Config::default()
                .save(config_path)
                .context("Failed to write config file")?;
            output::success(&format!(
                "Wrote default configuration to {}",
                config_path.display().to_string().yellow()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_passes_git_codes_through() {
        assert_eq!(exit_code(Some(0)), 0);
        assert_eq!(exit_code(Some(1)), 1);
        assert_eq!(exit_code(Some(129)), 129);
        assert_eq!(exit_code(Some(255)), 255);
    }

    #[test]
    fn exit_code_maps_unrepresentable_status_to_failure() {
        assert_eq!(exit_code(None), 1);
        assert_eq!(exit_code(Some(256)), 1);
        assert_eq!(exit_code(Some(-1)), 1);
    }
}
