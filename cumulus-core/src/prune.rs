use crate::{config::GlobalConfig, naming::ArtifactId, report::PruneOutcome};
use std::{
    path::Path,
    time::{Duration, SystemTime},
};
use tracing::{error, info};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// How long durable copies of an artifact are kept.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Default)]
pub enum Retention {
    /// Never prune.
    #[default]
    Disabled,
    Days(u32),
}

impl Retention {
    /// Parses a retention field. Anything but a positive whole number of days
    /// disables pruning.
    pub fn parse(s: &str) -> Retention {
        match s.trim().parse::<u32>() {
            Ok(days) if days > 0 => Retention::Days(days),
            _ => Retention::Disabled,
        }
    }
}

impl std::fmt::Display for Retention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retention::Disabled => write!(f, "disabled"),
            Retention::Days(days) => write!(f, "{} days", days),
        }
    }
}

/// Whether a file last modified at `modified` is past its retention window,
/// i.e. `modified + days < now`.
pub fn is_expired(modified: SystemTime, now: SystemTime, days: u32) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age > Duration::from_secs(u64::from(days) * SECONDS_PER_DAY),
        Err(_) => false,
    }
}

/// Deletes durable copies of `id` older than the retention window.
///
/// Only files matching the artifact's glob for the current encryption setting
/// are considered, so copies written with the other setting are left alone.
pub async fn prune(config: &GlobalConfig, id: &ArtifactId, retention: Retention) -> PruneOutcome {
    let days = match retention {
        Retention::Disabled => return PruneOutcome::Skipped,
        Retention::Days(days) => days,
    };
    let dir = id.durable_dir(&config.durable_root);
    let glob = id.durable_glob(config.encryption.is_enabled());
    let pattern = match glob::Pattern::new(&glob) {
        Ok(pattern) => pattern,
        Err(e) => {
            error!("invalid file pattern '{}': {}", glob, e);
            return PruneOutcome::Pruned {
                deleted: 0,
                errors: 1,
            };
        }
    };

    info!(
        "removing files matching '{}' older than {} days from {}",
        glob,
        days,
        dir.display()
    );
    prune_dir(&dir, &pattern, days, SystemTime::now()).await
}

pub async fn prune_dir(
    dir: &Path,
    pattern: &glob::Pattern,
    days: u32,
    now: SystemTime,
) -> PruneOutcome {
    let mut deleted = 0;
    let mut errors = 0;

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return PruneOutcome::Pruned { deleted, errors };
        }
        Err(e) => {
            error!("failed to list {}: {}", dir.display(), e);
            return PruneOutcome::Pruned { deleted, errors: 1 };
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("failed to list {}: {}", dir.display(), e);
                errors += 1;
                break;
            }
        };
        let name = entry.file_name();
        if !pattern.matches(&name.to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        let modified = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata.modified(),
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        match modified {
            Ok(modified) if is_expired(modified, now, days) => {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        info!("deleted {}", path.display());
                        deleted += 1;
                    }
                    Err(e) => {
                        error!("failed to delete {}: {}", path.display(), e);
                        errors += 1;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("failed to get modification time of {}: {}", path.display(), e);
                errors += 1;
            }
        }
    }

    PruneOutcome::Pruned { deleted, errors }
}
