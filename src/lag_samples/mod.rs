// Inner modules
mod emitter;
mod errors;
mod fetcher;
mod sample;

// Exports
pub use emitter::LagSamplesEmitter;
pub use errors::LagFetchError;
pub use fetcher::LagFetcher;
pub use sample::LagSample;

// Imports
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::KVPair;
use crate::config::ScalerConfig;
use crate::internals::Emitter;

pub fn init(
    config: &ScalerConfig,
    client_overrides: &[KVPair],
    shutdown_token: CancellationToken,
) -> (mpsc::Receiver<Vec<LagSample>>, JoinHandle<()>) {
    let (ls_rx, lse_join) = LagSamplesEmitter::new(
        config.build_client_config(client_overrides),
        config.topic.clone(),
        config.consumer_group.clone(),
        config.sampling_interval,
    )
    .spawn(shutdown_token);

    debug!("Initialized");
    (ls_rx, lse_join)
}
