use chrono::{DateTime, FixedOffset};
use git2::{ErrorCode, Repository, Time};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::error::{Error, Result};

/// Set on every commit retrogit makes so its own hooks leave it alone.
pub const AMEND_GUARD_ENV: &str = "RETROGIT_COMMIT_AMENDED";

pub struct GitOps {
    repo: Repository,
}

impl GitOps {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => Error::NotARepository(path.to_path_buf()),
            _ => Error::Git2(e),
        })?;
        Ok(Self { repo })
    }

    /// Directory `git` commands should run in.
    pub fn workdir(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    /// Committer date of `HEAD`, after stepping back `skip` first-parents.
    ///
    /// `None` when the branch has no commits yet or the history is shorter
    /// than `skip`.
    pub fn last_commit_time(&self, skip: usize) -> Result<Option<DateTime<FixedOffset>>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut commit = head.peel_to_commit()?;
        for _ in 0..skip {
            commit = match commit.parent(0) {
                Ok(parent) => parent,
                Err(_) => return Ok(None),
            };
        }

        to_datetime(commit.committer().when()).map(Some)
    }

    pub fn hooks_dir(&self) -> Result<PathBuf> {
        match self.repo.config()?.get_path("core.hooksPath") {
            Ok(path) if path.is_absolute() => Ok(path),
            Ok(path) => Ok(self.workdir().join(path)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(self.repo.path().join("hooks")),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `git commit` with both author and committer date forced to `date`.
    ///
    /// The child inherits stdio; its exit status is returned as-is.
    pub fn commit_with_date<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        date: &DateTime<FixedOffset>,
    ) -> Result<ExitStatus> {
        let date = git_date(date);
        let status = self
            .git()
            .arg("commit")
            .args(args)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .status()?;
        Ok(status)
    }

    /// Re-date `HEAD` in place.
    pub fn amend_date(&self, date: &DateTime<FixedOffset>) -> Result<()> {
        let date = git_date(date);
        let args = [
            "commit",
            "--amend",
            "--only",
            "--no-edit",
            "--no-verify",
            "--allow-empty",
            "--quiet",
            "--date",
            date.as_str(),
        ];

        // `--only` without paths keeps HEAD's tree, so changes still staged
        // after a pathspec commit stay out of it. That commit also leaves
        // GIT_INDEX_FILE pointing at a temporary index that is gone by now.
        let status = self
            .git()
            .args(args)
            .env("GIT_COMMITTER_DATE", &date)
            .env_remove("GIT_INDEX_FILE")
            .status()?;

        if !status.success() {
            return Err(Error::GitFailed {
                command: "commit --amend".to_string(),
                status,
            });
        }
        Ok(())
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(self.workdir()).env(AMEND_GUARD_ENV, "1");
        cmd
    }
}

pub fn to_datetime(time: Time) -> Result<DateTime<FixedOffset>> {
    let offset =
        FixedOffset::east_opt(time.offset_minutes() * 60).ok_or(Error::TimestampOutOfRange)?;
    DateTime::from_timestamp(time.seconds(), 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or(Error::TimestampOutOfRange)
}

/// Format accepted by `GIT_*_DATE` and `--date`.
pub fn git_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_at(repo: &Repository, seconds: i64, offset_minutes: i32, message: &str) {
        let sig = Signature::new("Test User", "test@example.com", &Time::new(seconds, offset_minutes))
            .unwrap();
        let mut index = repo.index().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    #[test]
    fn open_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        let err = GitOps::open(dir.path()).err().unwrap();
        assert!(matches!(err, Error::NotARepository(_)));
    }

    #[test]
    fn open_discovers_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert!(GitOps::open(&nested).is_ok());
    }

    #[test]
    fn empty_repository_has_no_last_commit() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();

        let git = GitOps::open(dir.path()).unwrap();
        assert_eq!(git.last_commit_time(0).unwrap(), None);
        assert_eq!(git.last_commit_time(1).unwrap(), None);
    }

    #[test]
    fn reads_committer_time_with_offset() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_at(&repo, 1_714_521_600, 120, "first");

        let git = GitOps::open(dir.path()).unwrap();
        let last = git.last_commit_time(0).unwrap().unwrap();
        assert_eq!(last.timestamp(), 1_714_521_600);
        assert_eq!(last.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn skip_walks_first_parents() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_at(&repo, 1_700_000_000, 0, "first");
        commit_at(&repo, 1_700_500_000, 0, "second");

        let git = GitOps::open(dir.path()).unwrap();
        assert_eq!(git.last_commit_time(0).unwrap().unwrap().timestamp(), 1_700_500_000);
        assert_eq!(git.last_commit_time(1).unwrap().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(git.last_commit_time(2).unwrap(), None);
    }

    #[test]
    fn hooks_dir_defaults_inside_git_dir() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();

        let git = GitOps::open(dir.path()).unwrap();
        assert!(git.hooks_dir().unwrap().ends_with(".git/hooks"));
    }

    #[test]
    fn hooks_dir_honors_relative_hooks_path() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.config()
            .unwrap()
            .set_str("core.hooksPath", ".githooks")
            .unwrap();

        let git = GitOps::open(dir.path()).unwrap();
        let hooks = git.hooks_dir().unwrap();
        assert!(hooks.ends_with(".githooks"));
        assert!(!hooks.to_string_lossy().contains(".git/"));
    }

    #[test]
    fn git_date_is_rfc2822() {
        let date = DateTime::parse_from_rfc3339("2024-05-03T04:05:06+02:00").unwrap();
        let formatted = git_date(&date);

        assert!(formatted.ends_with("+0200"), "{formatted}");
        assert_eq!(DateTime::parse_from_rfc2822(&formatted).unwrap(), date);
    }
}
