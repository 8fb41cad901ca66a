use clap::Parser as _;
use cli::Cli;
use cumulus_core::orchestrator;

mod cli;
mod logging;

const EXIT_INVALID_CONFIG: i32 = 1;

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() {
                EXIT_INVALID_CONFIG
            } else {
                0
            };
            err.print()?;
            std::process::exit(code);
        }
    };
    logging::setup(args.log_file.as_deref())?;

    match hostname::get() {
        Ok(name) => tracing::info!("instance name: {}", name.to_string_lossy()),
        Err(e) => tracing::warn!("failed to get host name: {}", e),
    }
    if let Some(version) = cumulus_core::VERSION {
        tracing::info!("cumulus: {}", version);
    }

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(EXIT_INVALID_CONFIG);
        }
    };

    // failed jobs are reported, but never change the exit status
    if let Err(e) = orchestrator::run(&config).await {
        tracing::error!("{}", e);
        std::process::exit(EXIT_INVALID_CONFIG);
    }
    Ok(())
}
