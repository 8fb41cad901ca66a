use crate::tools::Tools;
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Encryption {
    Disabled,
    Enabled { recipient: String },
}

impl Encryption {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Encryption::Enabled { .. })
    }
}

/// Settings shared by every job of a run. Built once at startup and never
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub durable_root: PathBuf,
    pub local_root: PathBuf,
    pub package_list: bool,
    pub encryption: Encryption,
    /// Directory containing the job catalogs.
    pub catalog_dir: PathBuf,
    pub tools: Tools,
    /// Date stamped into the names of all durable copies written by this run.
    pub date: Date,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    EmptyRoot(&'static str),
    #[error("{0} {} is not an existing directory", .1.display())]
    MissingRoot(&'static str, PathBuf),
    #[error("invalid value '{1}' for {0}, expected 0 or 1")]
    InvalidFlag(&'static str, String),
}

impl GlobalConfig {
    /// Checks that both roots are existing directories. Doesn't write
    /// anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_root("durable root", &self.durable_root)?;
        check_root("local root", &self.local_root)?;
        Ok(())
    }
}

fn check_root(what: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        Err(ConfigError::EmptyRoot(what))
    } else if !path.is_dir() {
        Err(ConfigError::MissingRoot(what, path.to_owned()))
    } else {
        Ok(())
    }
}

/// Parses a `0`/`1` command-line flag.
pub fn parse_flag(what: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ConfigError::InvalidFlag(what, value.to_owned())),
    }
}

/// Today's date in the local time zone, or in UTC if the local offset can't
/// be determined.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
