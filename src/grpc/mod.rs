// Inner modules
mod service;

pub mod externalscaler;

// Exports
pub use service::ScalerService;

// Imports
use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::config::ScalerConfig;
use crate::lag_window::SlidingWindow;
use externalscaler::external_scaler_server::ExternalScalerServer;

/// Serve the scaler RPCs until the given [`CancellationToken`] is cancelled.
///
/// In-flight RPCs are drained before this returns.
pub async fn init(
    window: Arc<SlidingWindow>,
    config: Arc<ScalerConfig>,
    port: u16,
    shutdown_token: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("gRPC server listening on {addr}");

    Server::builder()
        .add_service(ExternalScalerServer::new(ScalerService::new(
            window,
            config,
            shutdown_token.clone(),
        )))
        .serve_with_shutdown(addr, shutdown_token.cancelled_owned())
        .await
}
