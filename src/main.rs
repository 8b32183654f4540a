#[macro_use]
extern crate log;

mod cli;
mod config;
mod constants;
mod grpc;
mod internals;
mod lag_samples;
mod lag_window;
mod logging;

use std::error::Error;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cli::Cli;
use config::ScalerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = parse_cli_and_init_logging();

    let config = Arc::new(ScalerConfig::from_env()?);
    info!(
        "Observing lag of Group '{}' on Topic '{}' (brokers: '{}')",
        config.consumer_group, config.topic, config.bootstrap_servers
    );
    info!(
        "Reporting persistence at lag >= {}, sustained for {}s (sampling every {}s, window of {} samples)",
        config.lag_threshold,
        config.sustain_duration.num_seconds(),
        config.sampling_interval.as_secs(),
        config.window_size
    );

    let shutdown_token = build_shutdown_token();

    // Init `lag_samples` module: emits one batch of per-partition samples per sampling interval
    let (ls_rx, ls_join) = lag_samples::init(&config, &cli.config, shutdown_token.clone());

    // Init `lag_window` module: retains the emitted samples for the window duration
    let window = lag_window::init(config.window_size, config.sampling_interval, ls_rx);

    // Serve the scaler RPCs until shutdown; in-flight RPCs drain before this returns
    grpc::init(window, config, cli.port, shutdown_token).await?;

    // Join the sampling task, then let it terminate
    let _ = tokio::join!(ls_join);

    info!("Shutdown!");
    Ok(())
}

fn parse_cli_and_init_logging() -> Cli {
    // Parse command line input and initialize logging
    let cli = Cli::parse_and_validate();
    logging::init(cli.verbosity_level());

    trace!("Created:\n{:#?}", cli);

    cli
}

fn build_shutdown_token() -> CancellationToken {
    let shutdown_token = CancellationToken::new();

    // Setup shutdown signal handler:
    // when it's time to shutdown, cancels the token and all
    // other holders of a clone will be notified to begin shutdown sequence.
    //
    // NOTE: This handler will be listening on its own dedicated thread.
    let shutdown_token_clone = shutdown_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Beginning shutdown...");
        shutdown_token_clone.cancel();
    }) {
        error!("Failed to register signal handler: {e}");
    }

    // Return a CancellationToken that can notify other parts of the system.
    shutdown_token
}
