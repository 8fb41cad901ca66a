//! Turns one job into a durable artifact: produce it in the local root,
//! optionally encrypt it, copy it to the durable root and remove the local
//! files again.
//!
//! Every step runs regardless of how the previous ones went; failures are
//! only recorded in the [`JobReport`].

use crate::{
    catalog::{DatabaseJob, FolderJob},
    config::{Encryption, GlobalConfig},
    naming::{ArtifactId, ArtifactKind},
    report::JobReport,
    tools::{self, ExitStatus, PriorityHints},
};
use std::{path::Path, time::Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub enum Job<'a> {
    Folder(&'a FolderJob),
    Database(&'a DatabaseJob),
    PackageList,
}

impl<'a> Job<'a> {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Job::Folder(_) => ArtifactKind::Folder,
            Job::Database(_) => ArtifactKind::Database,
            Job::PackageList => ArtifactKind::PackageList,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Job::Folder(job) => job.source.clone(),
            Job::Database(job) => format!("{} ({})", job.name, job.dbms.name()),
            Job::PackageList => "installed packages".to_owned(),
        }
    }

    /// `None` for a folder job whose source has no last path segment, like `/`.
    pub fn artifact_id(&self) -> Option<ArtifactId> {
        match self {
            Job::Folder(job) => ArtifactId::for_folder(&job.source),
            Job::Database(job) => Some(ArtifactId::for_database(job.dbms.name(), &job.name)),
            Job::PackageList => Some(ArtifactId::PackageList),
        }
    }

    fn priority(&self) -> PriorityHints {
        match self {
            Job::Folder(job) => job.priority,
            _ => PriorityHints::default(),
        }
    }
}

pub async fn run(config: &GlobalConfig, job: Job<'_>) -> JobReport {
    let start = Instant::now();
    let mut report = JobReport::new(job.label(), job.kind());

    match job.artifact_id() {
        Some(id) => run_steps(config, job, &id, &mut report).await,
        None => {
            error!("can't derive a backup name from '{}'", job.label());
            report.archive = ExitStatus::Failed(None);
            report.relocate = ExitStatus::Failed(None);
        }
    }

    report.elapsed = start.elapsed();
    info!("{}", report.status_line());
    report
}

async fn run_steps(config: &GlobalConfig, job: Job<'_>, id: &ArtifactId, report: &mut JobReport) {
    let local = id.local_path(&config.local_root, false);
    let local_encrypted = id.local_path(&config.local_root, true);
    let durable = id.durable_path(
        &config.durable_root,
        config.date,
        config.encryption.is_enabled(),
    );

    let directories = match create_directories(config, id).await {
        Ok(()) => ExitStatus::Successful,
        Err(e) => {
            error!("failed to create backup directories: {}", e);
            ExitStatus::IO_FAILURE
        }
    };

    report.archive = ExitStatus::first_failure([
        directories,
        status_of(produce(config, job, &local).await),
    ]);
    if !report.archive.success() {
        error!("creating {} failed with status {}", local.display(), report.archive);
    }

    if let Encryption::Enabled { recipient } = &config.encryption {
        info!("encrypting {} for {}", local.display(), recipient);
        let status = status_of(
            config
                .tools
                .encrypt(recipient, &local, &local_encrypted, &job.priority())
                .await,
        );
        if !status.success() {
            warn!("encryption failed with status {}", status);
        }
        report.encrypt = Some(status);
    }

    let relocate_source = if config.encryption.is_enabled() {
        &local_encrypted
    } else {
        &local
    };
    report.relocate = relocate(relocate_source, &durable).await;
    report.cleanup = cleanup(&[local.as_path(), local_encrypted.as_path()]).await;
}

async fn create_directories(config: &GlobalConfig, id: &ArtifactId) -> std::io::Result<()> {
    tokio::fs::create_dir_all(id.durable_dir(&config.durable_root)).await?;
    tokio::fs::create_dir_all(id.local_dir(&config.local_root)).await?;
    Ok(())
}

async fn produce(config: &GlobalConfig, job: Job<'_>, dest: &Path) -> Result<ExitStatus, tools::Error> {
    match job {
        Job::Folder(job) => {
            info!("archiving {} to {}", job.source, dest.display());
            config.tools.archive(job, dest).await
        }
        Job::Database(job) => {
            info!(
                "dumping {} database {} to {}",
                job.dbms.name(),
                job.name,
                dest.display()
            );
            config.tools.dump_database(job, dest).await
        }
        Job::PackageList => {
            info!("writing package list to {}", dest.display());
            config.tools.package_list(dest).await
        }
    }
}

fn status_of(result: Result<ExitStatus, tools::Error>) -> ExitStatus {
    result.unwrap_or_else(|e| {
        error!("{}", error_chain(&e));
        ExitStatus::Failed(None)
    })
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

async fn relocate(source: &Path, dest: &Path) -> ExitStatus {
    let result = tokio::fs::copy(source, dest).await;
    match &result {
        Ok(size) => info!(
            "copied {} to {} ({})",
            source.display(),
            dest.display(),
            humansize::format_size(*size, humansize::DECIMAL)
        ),
        Err(e) => error!(
            "failed to copy {} to {}: {}",
            source.display(),
            dest.display(),
            e
        ),
    }
    ExitStatus::from_io(&result)
}

/// Removes the local files; files that don't exist are fine.
async fn cleanup(paths: &[&Path]) -> ExitStatus {
    let mut status = ExitStatus::Successful;
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                error!("failed to remove {}: {}", path.display(), e);
                status = ExitStatus::IO_FAILURE;
            }
        }
    }
    status
}
