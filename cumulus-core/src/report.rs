use crate::{naming::ArtifactKind, tools::ExitStatus};
use std::time::Duration;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PruneOutcome {
    Skipped,
    Pruned { deleted: usize, errors: usize },
}

/// What happened to one job of a run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct JobReport {
    pub label: String,
    pub kind: ArtifactKind,
    pub archive: ExitStatus,
    /// `None` if encryption is disabled.
    pub encrypt: Option<ExitStatus>,
    pub relocate: ExitStatus,
    pub cleanup: ExitStatus,
    pub prune: PruneOutcome,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn new(label: impl Into<String>, kind: ArtifactKind) -> Self {
        JobReport {
            label: label.into(),
            kind,
            archive: ExitStatus::Successful,
            encrypt: None,
            relocate: ExitStatus::Successful,
            cleanup: ExitStatus::Successful,
            prune: PruneOutcome::Skipped,
            elapsed: Duration::ZERO,
        }
    }

    /// A job succeeded if its artifact was produced, relocated and cleaned
    /// up. The encryption status does not count.
    pub fn combined_ok(&self) -> bool {
        self.archive.success() && self.relocate.success() && self.cleanup.success()
    }

    pub fn encryption_failed(&self) -> bool {
        matches!(self.encrypt, Some(status) if !status.success())
    }

    pub fn status_line(&self) -> String {
        if self.combined_ok() {
            "OK".to_owned()
        } else {
            format!(
                "FAILED (archive: {}, relocate: {}, cleanup: {})",
                self.archive, self.relocate, self.cleanup
            )
        }
    }
}

impl std::fmt::Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.label, self.status_line())?;
        if let Some(encrypt) = self.encrypt.filter(|s| !s.success()) {
            write!(f, ", encryption failed with {}", encrypt)?;
        }
        if let PruneOutcome::Pruned { deleted, errors } = self.prune {
            write!(f, ", pruned {} old copies", deleted)?;
            if errors > 0 {
                write!(f, " ({} errors)", errors)?;
            }
        }
        write!(f, " in {}", humantime::format_duration(whole_seconds(self.elapsed)))
    }
}

/// Result of a whole run. Only reported; a failed job never changes how the
/// run ends.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct RunReport {
    pub jobs: Vec<JobReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|job| !job.combined_ok())
    }

    pub fn log(&self) {
        for job in &self.jobs {
            if job.combined_ok() {
                tracing::info!("{}", job);
            } else {
                tracing::error!("{}", job);
            }
        }
        let failed = self.failed_jobs().count();
        if failed > 0 {
            tracing::warn!("{} of {} jobs failed", failed, self.jobs.len());
        }
        tracing::info!(
            "backup run finished after {} seconds",
            self.elapsed.as_secs()
        );
    }
}

fn whole_seconds(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
