use chrono::{DateTime, FixedOffset};
use colored::Colorize;
use std::env;
use std::process::ExitStatus;

use crate::error::Result;
use crate::git::{AMEND_GUARD_ENV, GitOps};
use crate::hook::shell_quote;
use crate::schedule::{Jitter, next_timestamp};
use crate::{RetroGit, output};

/// True inside a commit that retrogit itself is creating.
pub fn is_guarded() -> bool {
    env::var(AMEND_GUARD_ENV).is_ok_and(|v| v == "1")
}

impl RetroGit {
    /// The date the next commit on the current branch would receive.
    pub fn next_date(
        &self,
        now: DateTime<FixedOffset>,
        jitter: &mut dyn Jitter,
    ) -> Result<DateTime<FixedOffset>> {
        let git = GitOps::open(&self.repo_path)?;
        self.schedule(&git, 0, now, jitter)
    }

    /// Run `git commit <args>` with a scheduled date.
    ///
    /// A failing `git commit` is not an error here: its status is handed back
    /// so the caller can exit with the same code.
    pub fn commit(
        &self,
        args: &[String],
        now: DateTime<FixedOffset>,
        jitter: &mut dyn Jitter,
        dry_run: bool,
    ) -> Result<ExitStatus> {
        let git = GitOps::open(&self.repo_path)?;
        let date = self.schedule(&git, 0, now, jitter)?;

        if dry_run {
            output::dry_run_header("Commit preview");
            println!("  Commit date: {}", output::date(&date).cyan());
            println!("  Command: {}", command_line(args));
            return Ok(ExitStatus::default());
        }

        self.detail(&format!("Committing as {}", output::date(&date)));
        git.commit_with_date(args, &date)
    }

    /// `pre-commit` hook: refuse the commit if config or repository is unusable.
    ///
    /// Config validation already happened in [`RetroGit::new`].
    pub fn pre_commit(&self) -> Result<()> {
        if is_guarded() {
            return Ok(());
        }
        GitOps::open(&self.repo_path)?;
        Ok(())
    }

    /// `post-commit` hook: re-date the commit that was just created.
    ///
    /// The schedule is anchored on HEAD's parent, since HEAD is the new commit.
    pub fn post_commit(&self, now: DateTime<FixedOffset>, jitter: &mut dyn Jitter) -> Result<()> {
        if is_guarded() {
            return Ok(());
        }

        let git = GitOps::open(&self.repo_path)?;
        let date = self.schedule(&git, 1, now, jitter)?;

        output::info(&format!(
            "RetroGit: setting commit date to {}",
            output::date(&date).cyan()
        ));
        git.amend_date(&date)
    }

    fn schedule(
        &self,
        git: &GitOps,
        skip: usize,
        now: DateTime<FixedOffset>,
        jitter: &mut dyn Jitter,
    ) -> Result<DateTime<FixedOffset>> {
        let last = git.last_commit_time(skip)?;
        match &last {
            Some(last) => self.detail(&format!("Previous commit dated {}", output::date(last))),
            None => self.detail(&format!(
                "No previous commit, backdating {} days",
                self.config.timing.initial_backdate_days
            )),
        }

        next_timestamp(last, &self.config.timing, now, jitter)
    }
}

/// `git commit <args>` as it could be pasted into a shell.
fn command_line(args: &[String]) -> String {
    let mut line = String::from("git commit");
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}
