use super::Error;
use std::{path::Path, process::Stdio};
use tokio::process::Command;

/// Outcome of one step of a backup job.
///
/// Steps that don't run an external program report `Failed(Some(1))` on I/O
/// errors, which is what `cp` and `rm` exit with.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum ExitStatus {
    Successful,
    Failed(Option<i32>),
}

impl ExitStatus {
    pub const IO_FAILURE: ExitStatus = ExitStatus::Failed(Some(1));

    pub fn success(&self) -> bool {
        self == &ExitStatus::Successful
    }

    /// Combines the statuses of the stages of a pipeline: the first failing
    /// stage determines the result.
    pub fn first_failure(statuses: impl IntoIterator<Item = ExitStatus>) -> ExitStatus {
        statuses
            .into_iter()
            .find(|status| !status.success())
            .unwrap_or(ExitStatus::Successful)
    }

    pub fn from_io<T>(result: &std::io::Result<T>) -> ExitStatus {
        match result {
            Ok(_) => ExitStatus::Successful,
            Err(_) => ExitStatus::IO_FAILURE,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if status.success() {
            ExitStatus::Successful
        } else {
            ExitStatus::Failed(status.code())
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Successful => write!(f, "0"),
            ExitStatus::Failed(Some(code)) => write!(f, "{}", code),
            ExitStatus::Failed(None) => write!(f, "?"),
        }
    }
}

async fn create_output(dest: &Path) -> Result<std::fs::File, Error> {
    let file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::OutputFileError(dest.to_owned(), e))?;
    Ok(file.into_std().await)
}

fn spawn(cmd: &mut Command) -> Result<tokio::process::Child, Error> {
    cmd.spawn().map_err(|e| {
        Error::FailedToStartProcess(Path::new(cmd.as_std().get_program()).to_owned(), e)
    })
}

/// Runs `cmd` with its standard output written to `dest`, replacing any
/// existing file.
pub(crate) async fn run_to_file(mut cmd: Command, dest: &Path) -> Result<ExitStatus, Error> {
    let output = create_output(dest).await?;
    cmd.stdin(Stdio::null())
        .stdout(output)
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let status = spawn(&mut cmd)?
        .wait()
        .await
        .map_err(Error::SubprocessStatusError)?;
    Ok(status.into())
}

/// Runs `producer | consumer > dest` and observes the exit status of both
/// stages.
pub(crate) async fn run_piped_to_file(
    mut producer: Command,
    mut consumer: Command,
    dest: &Path,
) -> Result<ExitStatus, Error> {
    let output = create_output(dest).await?;
    producer
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    let mut producer_child = spawn(&mut producer)?;

    let pipe: Stdio = producer_child
        .stdout
        .take()
        .ok_or_else(|| {
            Error::PipeError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "producer output is not captured",
            ))
        })?
        .try_into()
        .map_err(Error::PipeError)?;
    consumer
        .stdin(pipe)
        .stdout(output)
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    let mut consumer_child = spawn(&mut consumer)?;
    // the read end of the pipe must only stay open in the consumer, otherwise
    // the producer never sees EPIPE if the consumer exits early
    drop(consumer);

    let consumer_status = consumer_child
        .wait()
        .await
        .map_err(Error::SubprocessStatusError)?;
    let producer_status = producer_child
        .wait()
        .await
        .map_err(Error::SubprocessStatusError)?;
    tracing::debug!(
        producer = %ExitStatus::from(producer_status),
        consumer = %ExitStatus::from(consumer_status),
        "pipeline finished"
    );

    Ok(ExitStatus::first_failure([
        producer_status.into(),
        consumer_status.into(),
    ]))
}
