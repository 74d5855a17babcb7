pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod hook;
pub mod output;
pub mod schedule;

pub use config::{Config, TimingConfig};
pub use error::{Error, Result};
pub use schedule::{Jitter, RandomJitter, next_timestamp};

use std::path::{Path, PathBuf};

pub struct RetroGit {
    pub repo_path: PathBuf,
    pub config: Config,
    pub verbose: bool,
}

impl RetroGit {
    /// Bind a validated config to a repository path.
    ///
    /// Validation happens here so a bad config stops every command before
    /// git is touched.
    pub fn new<P: AsRef<Path>>(repo_path: P, config: Config) -> Result<Self> {
        config.timing.validate()?;

        Ok(Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            config,
            verbose: false,
        })
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn detail(&self, msg: &str) {
        if self.verbose {
            output::info(msg);
        }
    }
}
