//! File names and locations of backup artifacts.
//!
//! Every artifact has a *stem* and an *extension*. The durable copy is stored
//! as `<stem>_<date>.<extension>`, the local staging copy as
//! `<stem>.<extension>` so that consecutive runs overwrite it instead of piling
//! up. Encrypted artifacts get [`ENCRYPTION_SUFFIX`] appended in both places.

use std::path::{Path, PathBuf};
use time::Date;

pub const ENCRYPTION_SUFFIX: &str = ".gpg";

const DATABASE_SUBDIRECTORY: &str = "db";
const PACKAGE_LIST_NAME: &str = "packageList";

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum ArtifactKind {
    Folder,
    Database,
    PackageList,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Folder => write!(f, "folder"),
            ArtifactKind::Database => write!(f, "database"),
            ArtifactKind::PackageList => write!(f, "package list"),
        }
    }
}

/// The stable identity of one logical artifact. All historical durable copies
/// of an artifact share its identity and differ only by date.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ArtifactId {
    Folder { name: String },
    Database { dbms: String, name: String },
    PackageList,
}

impl ArtifactId {
    /// Identity of a folder backup, named after the last segment of `source`.
    ///
    /// Two sources with the same last segment map to the same identity and
    /// share their durable directory.
    pub fn for_folder(source: &str) -> Option<ArtifactId> {
        folder_logical_name(source).map(|name| ArtifactId::Folder { name })
    }

    pub fn for_database(dbms: &str, name: &str) -> ArtifactId {
        ArtifactId::Database {
            dbms: dbms.to_owned(),
            name: name.to_owned(),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactId::Folder { .. } => ArtifactKind::Folder,
            ArtifactId::Database { .. } => ArtifactKind::Database,
            ArtifactId::PackageList => ArtifactKind::PackageList,
        }
    }

    pub fn logical_name(&self) -> String {
        match self {
            ArtifactId::Folder { name } => name.clone(),
            ArtifactId::Database { dbms, name } => format!("{}_db_{}", dbms, name),
            ArtifactId::PackageList => PACKAGE_LIST_NAME.to_owned(),
        }
    }

    fn stem(&self) -> String {
        match self {
            ArtifactId::Folder { name } => format!("{}_backup", name),
            _ => self.logical_name(),
        }
    }

    fn extension(&self) -> &'static str {
        match self.kind() {
            ArtifactKind::Folder => "tar.gz",
            ArtifactKind::Database => "sql.gz",
            ArtifactKind::PackageList => "list",
        }
    }

    /// Directory below the durable and the local root holding this artifact.
    pub fn subdirectory(&self) -> String {
        match self {
            ArtifactId::Folder { name } => name.clone(),
            ArtifactId::Database { .. } => DATABASE_SUBDIRECTORY.to_owned(),
            ArtifactId::PackageList => PACKAGE_LIST_NAME.to_owned(),
        }
    }

    pub fn local_file_name(&self, encrypted: bool) -> String {
        with_suffix(format!("{}.{}", self.stem(), self.extension()), encrypted)
    }

    pub fn durable_file_name(&self, date: Date, encrypted: bool) -> String {
        with_suffix(
            format!("{}_{}.{}", self.stem(), format_date(date), self.extension()),
            encrypted,
        )
    }

    /// Glob matching every durable copy of this artifact regardless of date.
    ///
    /// The date part only matches `YYYY-MM-DD`, so `orders` doesn't pick up
    /// the dumps of `orders_archive` living in the same directory.
    pub fn durable_glob(&self, encrypted: bool) -> String {
        with_suffix(
            format!(
                "{}_{}.{}",
                glob::Pattern::escape(&self.stem()),
                DATE_GLOB,
                self.extension()
            ),
            encrypted,
        )
    }

    pub fn local_dir(&self, local_root: &Path) -> PathBuf {
        local_root.join(self.subdirectory())
    }

    pub fn durable_dir(&self, durable_root: &Path) -> PathBuf {
        durable_root.join(self.subdirectory())
    }

    pub fn local_path(&self, local_root: &Path, encrypted: bool) -> PathBuf {
        self.local_dir(local_root)
            .join(self.local_file_name(encrypted))
    }

    pub fn durable_path(&self, durable_root: &Path, date: Date, encrypted: bool) -> PathBuf {
        self.durable_dir(durable_root)
            .join(self.durable_file_name(date, encrypted))
    }
}

const DATE_GLOB: &str = "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]";

fn with_suffix(name: String, encrypted: bool) -> String {
    if encrypted {
        name + ENCRYPTION_SUFFIX
    } else {
        name
    }
}

/// Last path segment of a folder job's source directory.
pub fn folder_logical_name(source: &str) -> Option<String> {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}
