//! The job catalogs: two line-oriented tables with `;`-separated fields.
//!
//! ```text
//! # path;excludes;retention_days;io_nice,io_class;cpu_nice
//! /srv/www;cache,tmp;14;7,2;19
//!
//! # name;dbms;user,password,port,host;retention_days
//! orders;postgres;backup,secret,5432,localhost;30
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Missing trailing
//! fields are treated as empty; nothing else is validated.

use crate::{prune::Retention, tools::PriorityHints};
use std::path::{Path, PathBuf};

pub const FIELD_SEPARATOR: char = ';';
pub const LIST_SEPARATOR: char = ',';

pub const FOLDER_CATALOG: &str = "folders.conf";
pub const DATABASE_CATALOG: &str = "databases.conf";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("i/o error reading job catalog {}", .0.display())]
    IoError(PathBuf, #[source] std::io::Error),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FolderJob {
    pub source: String,
    pub excludes: Vec<String>,
    pub retention: Retention,
    pub priority: PriorityHints,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Dbms {
    Postgres,
    MySql,
    Unknown(String),
}

impl Dbms {
    pub fn parse(s: &str) -> Dbms {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Dbms::Postgres,
            "mysql" | "mariadb" => Dbms::MySql,
            _ => Dbms::Unknown(s.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Dbms::Postgres => "postgres",
            Dbms::MySql => "mysql",
            Dbms::Unknown(name) => name,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Default)]
pub struct Connection {
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<String>,
    pub host: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("host", &self.host)
            .finish()
    }
}

impl Connection {
    fn parse(s: &str) -> Connection {
        let mut parts = s.split(LIST_SEPARATOR).map(non_empty);
        Connection {
            user: parts.next().flatten(),
            password: parts.next().flatten(),
            port: parts.next().flatten(),
            host: parts.next().flatten(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DatabaseJob {
    pub name: String,
    pub dbms: Dbms,
    pub connection: Connection,
    pub retention: Retention,
}

fn non_empty(s: &str) -> Option<String> {
    Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_owned)
}

fn parse_number(s: &str) -> Option<i32> {
    s.trim().parse().ok()
}

/// Splits the job lines of a catalog into their fields, padding missing
/// trailing fields with empty strings.
fn rows<const N: usize>(input: &str) -> impl Iterator<Item = [&str; N]> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut fields = [""; N];
            for (field, value) in fields.iter_mut().zip(line.split(FIELD_SEPARATOR)) {
                *field = value.trim();
            }
            fields
        })
}

pub fn parse_folder_jobs(input: &str) -> Vec<FolderJob> {
    rows::<5>(input)
        .map(|[source, excludes, retention, io_hints, cpu_nice]| {
            let mut io_hints = io_hints.split(LIST_SEPARATOR);
            FolderJob {
                source: source.to_owned(),
                excludes: excludes.split(LIST_SEPARATOR).filter_map(non_empty).collect(),
                retention: Retention::parse(retention),
                priority: PriorityHints {
                    io_nice: io_hints.next().and_then(parse_number),
                    io_class: io_hints.next().and_then(parse_number),
                    cpu_nice: parse_number(cpu_nice),
                },
            }
        })
        .collect()
}

pub fn parse_database_jobs(input: &str) -> Vec<DatabaseJob> {
    rows::<4>(input)
        .map(|[name, dbms, connection, retention]| DatabaseJob {
            name: name.to_owned(),
            dbms: Dbms::parse(dbms),
            connection: Connection::parse(connection),
            retention: Retention::parse(retention),
        })
        .collect()
}

async fn read_catalog(path: &Path) -> Result<String, CatalogError> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("job catalog {} does not exist, no jobs to run", path.display());
            Ok(String::new())
        }
        Err(e) => Err(CatalogError::IoError(path.to_owned(), e)),
    }
}

pub async fn load_folder_jobs(path: &Path) -> Result<Vec<FolderJob>, CatalogError> {
    Ok(parse_folder_jobs(&read_catalog(path).await?))
}

pub async fn load_database_jobs(path: &Path) -> Result<Vec<DatabaseJob>, CatalogError> {
    Ok(parse_database_jobs(&read_catalog(path).await?))
}
