use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `[timing]` value failed validation.
    #[error("invalid configuration: `timing.{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The computed date falls outside the representable range.
    #[error("commit date is out of range")]
    TimestampOutOfRange,

    #[error("{} already exists and was not installed by retrogit (use --yes to overwrite)", .0.display())]
    HookExists(PathBuf),

    #[error("`git {command}` failed with {status}")]
    GitFailed { command: String, status: ExitStatus },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
