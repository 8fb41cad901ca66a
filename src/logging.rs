use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{layer, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Registry,
};

/// Logs to stdout with local timestamps and, if `log_file` is set, appends the
/// same lines without colors to that file.
pub fn setup(log_file: Option<&Path>) -> eyre::Result<()> {
    let time_format = time::macros::format_description!(
        "[year]-[month]-[day] [hour repr:24]:[minute]:[second]"
    );

    let builder = Registry::default()
        .with(LevelFilter::from(Level::INFO))
        .with(
            layer()
                .with_ansi(true)
                .with_target(false)
                .with_timer(LocalTime::new(time_format)),
        );

    if let Some(log_file) = log_file {
        let file = std::fs::File::options()
            .append(true)
            .create(true)
            .open(log_file)?;
        builder
            .with(
                layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_timer(LocalTime::new(time_format))
                    .with_writer(file),
            )
            .try_init()?;
    } else {
        builder.try_init()?;
    }

    Ok(())
}
