use colored::Colorize;
use dialoguer::Confirm;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git::GitOps;
use crate::{RetroGit, output};

/// Marks hook files retrogit owns and may replace or delete.
pub const HOOK_MARKER: &str = "# Installed by retrogit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookStage {
    /// Validates configuration before git creates the commit.
    PreCommit,
    /// Amends the new commit with the scheduled date.
    PostCommit,
}

impl HookStage {
    pub const ALL: [HookStage; 2] = [HookStage::PreCommit, HookStage::PostCommit];

    pub fn name(self) -> &'static str {
        match self {
            HookStage::PreCommit => "pre-commit",
            HookStage::PostCommit => "post-commit",
        }
    }
}

/// What to do when a hook file we did not write is already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Always,
    Prompt,
    Never,
}

/// Shell shim that forwards a git hook to the retrogit binary.
#[derive(Debug, Clone)]
pub struct HookScript {
    exe: PathBuf,
    config: Option<PathBuf>,
}

impl HookScript {
    pub fn new(exe: impl Into<PathBuf>, config: Option<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            config,
        }
    }

    /// Shim pointing at the running executable.
    pub fn current(config: Option<PathBuf>) -> Result<Self> {
        Ok(Self::new(env::current_exe()?, config))
    }

    pub fn render(&self, stage: HookStage) -> String {
        let mut command = format!("exec {}", shell_quote(&self.exe.to_string_lossy()));
        if let Some(config) = &self.config {
            command.push_str(&format!(
                " --config {}",
                shell_quote(&config.to_string_lossy())
            ));
        }
        command.push_str(&format!(" hook {}", stage.name()));

        format!(
            "#!/bin/sh\n{HOOK_MARKER} Remove with `retrogit uninstall`.\n{command}\n"
        )
    }
}

/// Quote `arg` for `sh`, leaving plain words as they are.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub fn is_retrogit_hook(path: &Path) -> bool {
    fs::read_to_string(path).is_ok_and(|contents| contents.contains(HOOK_MARKER))
}

impl RetroGit {
    /// Write the pre-commit and post-commit shims into the hooks directory.
    ///
    /// Returns the paths that were (or in a dry run, would be) written.
    pub fn install(
        &self,
        script: &HookScript,
        overwrite: Overwrite,
        dry_run: bool,
    ) -> Result<Vec<PathBuf>> {
        let git = GitOps::open(&self.repo_path)?;
        let hooks_dir = git.hooks_dir()?;
        self.detail(&format!("Hooks directory: {}", hooks_dir.display()));

        let mut planned = Vec::new();
        for stage in HookStage::ALL {
            let path = hooks_dir.join(stage.name());
            if path.exists() && !is_retrogit_hook(&path) && !allow_overwrite(&path, overwrite)? {
                output::warn(&format!("Left existing {} untouched", path.display()));
                continue;
            }
            planned.push((stage, path));
        }

        if dry_run {
            output::dry_run_header("Install preview");
            for (stage, path) in &planned {
                println!("  {} {}", "→".blue(), path.display().to_string().green());
                for line in script.render(*stage).lines() {
                    println!("      {line}");
                }
            }
            return Ok(planned.into_iter().map(|(_, path)| path).collect());
        }

        fs::create_dir_all(&hooks_dir)?;
        let mut written = Vec::new();
        for (stage, path) in planned {
            fs::write(&path, script.render(stage))?;
            make_executable(&path)?;
            output::success(&format!("Installed {} hook at {}", stage.name(), path.display()));
            written.push(path);
        }

        Ok(written)
    }

    /// Remove hooks written by [`RetroGit::install`], leaving any others alone.
    pub fn uninstall(&self, dry_run: bool) -> Result<Vec<PathBuf>> {
        let git = GitOps::open(&self.repo_path)?;
        let hooks_dir = git.hooks_dir()?;

        let ours: Vec<PathBuf> = HookStage::ALL
            .iter()
            .map(|stage| hooks_dir.join(stage.name()))
            .filter(|path| is_retrogit_hook(path))
            .collect();

        if ours.is_empty() {
            output::info("No retrogit hooks installed");
            return Ok(ours);
        }

        if dry_run {
            output::dry_run_header("Uninstall preview");
            for path in &ours {
                println!("  {} would remove {}", "→".blue(), path.display());
            }
            return Ok(ours);
        }

        for path in &ours {
            fs::remove_file(path)?;
            output::success(&format!("Removed {}", path.display()));
        }
        Ok(ours)
    }
}

fn allow_overwrite(path: &Path, overwrite: Overwrite) -> Result<bool> {
    match overwrite {
        Overwrite::Always => Ok(true),
        Overwrite::Never => Err(Error::HookExists(path.to_path_buf())),
        Overwrite::Prompt => Confirm::new()
            .with_prompt(format!(
                "{} was not installed by retrogit. Overwrite it?",
                path.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| Error::Io(std::io::Error::other(e))),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
