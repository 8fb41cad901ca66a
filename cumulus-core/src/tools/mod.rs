//! The external programs a backup run drives: archiver, compressor, encryption
//! tool, database dump utilities and the package manager.

use crate::catalog::{DatabaseJob, Dbms, FolderJob};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::process::Command;

pub use process::*;

mod priority;
mod process;

pub use priority::PriorityHints;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to start {}", .0.display())]
    FailedToStartProcess(PathBuf, #[source] std::io::Error),
    #[error("error getting subprocess status")]
    SubprocessStatusError(#[source] std::io::Error),
    #[error("failed to connect the stages of a pipeline")]
    PipeError(#[source] std::io::Error),
    #[error("failed to create output file {}", .0.display())]
    OutputFileError(PathBuf, #[source] std::io::Error),
    #[error("unsupported database system '{0}'")]
    UnsupportedDbms(String),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ToolCommand {
    pub path: PathBuf,
}

impl ToolCommand {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ToolCommand { path: path.into() }
    }

    fn to_command(&self) -> Command {
        Command::new(&self.path)
    }
}

/// Locations of all external programs.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Tools {
    pub tar: ToolCommand,
    pub gzip: ToolCommand,
    pub gpg: ToolCommand,
    pub pg_dump: ToolCommand,
    pub mysqldump: ToolCommand,
    pub package_list: ToolCommand,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            tar: ToolCommand::from_path("tar"),
            gzip: ToolCommand::from_path("gzip"),
            gpg: ToolCommand::from_path("gpg"),
            pg_dump: ToolCommand::from_path("pg_dump"),
            mysqldump: ToolCommand::from_path("mysqldump"),
            package_list: ToolCommand::from_path("dpkg"),
        }
    }
}

impl Tools {
    /// Writes a gzip-compressed tar archive of the job's source directory to
    /// `dest`.
    pub async fn archive(&self, job: &FolderJob, dest: &Path) -> Result<ExitStatus, Error> {
        let mut cmd = self.tar.to_command();
        cmd.args(Self::archive_args(job));
        job.priority.apply(&mut cmd);
        run_to_file(cmd, dest).await
    }

    fn archive_args(job: &FolderJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["--create", "--gzip", "--preserve-permissions", "--file", "-"]
            .iter()
            .map(OsString::from)
            .collect();
        for exclude in &job.excludes {
            args.push(format!("--exclude={}", exclude).into());
        }
        args.push(job.source.clone().into());
        args
    }

    /// Writes a gzip-compressed SQL dump of the job's database to `dest`.
    ///
    /// The dump utility and `gzip` run as a pipeline; a failure of either
    /// stage fails the dump, the dump utility's status taking precedence.
    pub async fn dump_database(&self, job: &DatabaseJob, dest: &Path) -> Result<ExitStatus, Error> {
        let mut dump = match &job.dbms {
            Dbms::Postgres => self.pg_dump.to_command(),
            Dbms::MySql => self.mysqldump.to_command(),
            Dbms::Unknown(name) => return Err(Error::UnsupportedDbms(name.clone())),
        };
        dump.args(Self::dump_args(job));
        if let Some(password) = &job.connection.password {
            match job.dbms {
                Dbms::Postgres => dump.env("PGPASSWORD", password),
                _ => dump.env("MYSQL_PWD", password),
            };
        }

        let mut gzip = self.gzip.to_command();
        gzip.arg("-c");

        run_piped_to_file(dump, gzip, dest).await
    }

    fn dump_args(job: &DatabaseJob) -> Vec<String> {
        let conn = &job.connection;
        let (user_flag, extra) = match job.dbms {
            Dbms::MySql => ("--user", Some("--single-transaction")),
            _ => ("--username", None),
        };
        let mut args = Vec::new();
        for (flag, value) in [
            (user_flag, &conn.user),
            ("--host", &conn.host),
            ("--port", &conn.port),
        ] {
            if let Some(value) = value {
                args.push(flag.to_owned());
                args.push(value.clone());
            }
        }
        if let Some(extra) = extra {
            args.push(extra.to_owned());
        }
        args.push(job.name.clone());
        args
    }

    /// Writes the list of installed packages to `dest`.
    pub async fn package_list(&self, dest: &Path) -> Result<ExitStatus, Error> {
        let mut cmd = self.package_list.to_command();
        cmd.arg("--get-selections");
        run_to_file(cmd, dest).await
    }

    /// Encrypts `input` for `recipient` into `dest`, overwriting `dest` if it
    /// exists. Never prompts.
    ///
    /// If encryption fails `dest` is removed again, so no partial or empty
    /// ciphertext is left behind.
    pub async fn encrypt(
        &self,
        recipient: &str,
        input: &Path,
        dest: &Path,
        priority: &PriorityHints,
    ) -> Result<ExitStatus, Error> {
        let mut cmd = self.gpg.to_command();
        cmd.args(["--batch", "--yes", "--trust-model", "always", "--recipient"])
            .arg(recipient)
            .args(["--output", "-", "--encrypt"])
            .arg(input);
        priority.apply(&mut cmd);

        let result = run_to_file(cmd, dest).await;
        if !matches!(result, Ok(ExitStatus::Successful)) {
            match tokio::fs::remove_file(dest).await {
                Ok(()) => tracing::debug!("removed incomplete {}", dest.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("failed to remove {}: {}", dest.display(), e),
            }
        }
        result
    }
}
