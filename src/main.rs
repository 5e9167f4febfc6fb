mod api;
mod cli;
mod config;
mod core;
mod poll;
mod prelude;

use clap::{Parser, crate_version};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{
        emi::{self, GxpPrices},
        heartbeat,
        mqtt::{Publisher, Topics},
    },
    cli::Args,
    config::Config,
    poll::PollLoop,
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let config = Config::read_from(&args.config_path()?)?;

    let source = GxpPrices::builder()
        .api(emi::Api::new(config.emi.endpoint()?, config.emi.timeout())?)
        .api_key(config.emi.api_key)
        .gxp(config.emi.gxp)
        .build();
    let topics = Topics::try_resolve(config.mqtt.hostname.as_deref())?;
    let publisher = Publisher::connect(&config.mqtt.broker(), topics)
        .await
        .context("failed to establish the broker session")?;
    if config.mqtt.run_verbose {
        info!(
            prices = %publisher.topics().data,
            presence = %publisher.topics().presence,
            "running",
        );
    }

    let shutdown = shutdown_signal()?;
    PollLoop::builder()
        .interval(config.mqtt.wait())
        .verbose(config.mqtt.run_verbose)
        .heartbeat(heartbeat::Client::new(args.heartbeat_url)?)
        .build()
        .run(&source, &publisher, shutdown)
        .await;

    publisher.disconnect().await?;
    info!("done!");
    Ok(())
}

/// Resolve on Ctrl+C or, on Unix, on `SIGTERM`.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install the `SIGTERM` handler")?;

    Ok(async move {
        #[cfg(unix)]
        let terminate = terminate.recv();
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(error) = result {
                    error!("failed to listen for Ctrl+C: {error:#}");
                }
            }
            _ = terminate => {}
        }
        info!("shutting down…");
    })
}
