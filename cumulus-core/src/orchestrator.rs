use crate::{
    catalog::{self, CatalogError, DATABASE_CATALOG, FOLDER_CATALOG},
    config::{ConfigError, GlobalConfig},
    pipeline::{self, Job},
    prune::{self, Retention},
    report::{JobReport, RunReport},
};
use std::time::Instant;
use tracing::Instrument as _;

/// Package lists are always kept for this long.
pub const PACKAGE_LIST_RETENTION: Retention = Retention::Days(30);

/// Runs all configured jobs one after the other.
///
/// Only an invalid configuration is an error. Once validation passed every
/// job is attempted and failures end up in the returned [`RunReport`]; the
/// caller is expected to exit successfully regardless.
pub async fn run(config: &GlobalConfig) -> Result<RunReport, ConfigError> {
    config.validate()?;
    let start = Instant::now();
    let mut jobs = Vec::new();

    let folder_jobs =
        jobs_or_empty(catalog::load_folder_jobs(&config.catalog_dir.join(FOLDER_CATALOG)).await);
    tracing::info!("running {} folder backups", folder_jobs.len());
    for job in &folder_jobs {
        jobs.push(run_job(config, Job::Folder(job), job.retention).await);
    }

    let database_jobs = jobs_or_empty(
        catalog::load_database_jobs(&config.catalog_dir.join(DATABASE_CATALOG)).await,
    );
    tracing::info!("running {} database backups", database_jobs.len());
    for job in &database_jobs {
        jobs.push(run_job(config, Job::Database(job), job.retention).await);
    }

    if config.package_list {
        jobs.push(run_job(config, Job::PackageList, PACKAGE_LIST_RETENTION).await);
    }

    let report = RunReport {
        jobs,
        elapsed: start.elapsed(),
    };
    report.log();
    Ok(report)
}

fn jobs_or_empty<T>(result: Result<Vec<T>, CatalogError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::error!("{}, skipping its jobs", e);
        Vec::new()
    })
}

async fn run_job(config: &GlobalConfig, job: Job<'_>, retention: Retention) -> JobReport {
    let span = tracing::info_span!(
        "job",
        kind = %job.kind(),
        name = %job.label(),
        retention = %retention
    );
    async move {
        let mut report = pipeline::run(config, job).await;
        match job.artifact_id() {
            Some(id) => report.prune = prune::prune(config, &id, retention).await,
            None => tracing::debug!("not pruning, no backup name"),
        }
        report
    }
    .instrument(span)
    .await
}
