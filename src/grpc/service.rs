use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_stream::{wrappers::ReceiverStream, Stream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use super::externalscaler::external_scaler_server::ExternalScaler;
use super::externalscaler::{
    GetMetricSpecResponse, GetMetricsRequest, GetMetricsResponse, IsActiveResponse, MetricSpec,
    MetricValue, ScaledObjectRef,
};
use crate::config::ScalerConfig;
use crate::constants::PERSISTENT_LAG_METRIC;
use crate::lag_window::{evaluate_persistence, EvaluationResult, SlidingWindow};

const CHANNEL_SIZE: usize = 5;

/// RPC facade translating window evaluations into the four operations the
/// autoscaling orchestrator expects.
///
/// Every operation answers from the current window snapshot: none of them
/// contacts the Cluster, and none of them fails because the window is empty
/// or underfilled. No data simply reads as "not active, zero lag", so a
/// scraping hiccup can never turn into a scaling event.
pub struct ScalerService {
    window: Arc<SlidingWindow>,
    config: Arc<ScalerConfig>,
    shutdown_token: CancellationToken,
}

impl ScalerService {
    /// Create a new [`ScalerService`].
    ///
    /// # Arguments
    ///
    /// * `window` - The [`SlidingWindow`] to evaluate on every request
    /// * `config` - Threshold, sustain duration and sampling interval
    /// * `shutdown_token` - Cancelled when the process shuts down; closes open streams
    pub fn new(
        window: Arc<SlidingWindow>,
        config: Arc<ScalerConfig>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            window,
            config,
            shutdown_token,
        }
    }

    async fn evaluate(&self) -> EvaluationResult {
        let samples = self.window.snapshot().await;
        evaluate_persistence(&samples, self.config.lag_threshold, self.config.sustain_duration)
    }
}

/// Stream of [`IsActiveResponse`], one per sampling interval.
pub type IsActiveStream = Pin<Box<dyn Stream<Item = Result<IsActiveResponse, Status>> + Send>>;

#[tonic::async_trait]
impl ExternalScaler for ScalerService {
    async fn is_active(
        &self,
        request: Request<ScaledObjectRef>,
    ) -> Result<Response<IsActiveResponse>, Status> {
        let scaled_object = request.into_inner();
        let result = self.evaluate().await;

        debug!(
            "IsActive('{}/{}'): persistent={} total_current_lag={}",
            scaled_object.namespace, scaled_object.name, result.persistent, result.total_current_lag
        );

        Ok(Response::new(IsActiveResponse {
            result: result.persistent,
        }))
    }

    type StreamIsActiveStream = IsActiveStream;

    async fn stream_is_active(
        &self,
        request: Request<ScaledObjectRef>,
    ) -> Result<Response<Self::StreamIsActiveStream>, Status> {
        let scaled_object = request.into_inner();
        info!(
            "StreamIsActive('{}/{}'): stream opened",
            scaled_object.namespace, scaled_object.name
        );

        let window = self.window.clone();
        let config = self.config.clone();
        let shutdown_token = self.shutdown_token.clone();

        let (sx, rx) = mpsc::channel(CHANNEL_SIZE);
        tokio::spawn(async move {
            let mut interval = interval_at(
                Instant::now() + config.sampling_interval,
                config.sampling_interval,
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let samples = window.snapshot().await;
                        let result = evaluate_persistence(
                            &samples,
                            config.lag_threshold,
                            config.sustain_duration,
                        );
                        trace!(
                            "StreamIsActive('{}/{}'): persistent={} total_current_lag={}",
                            scaled_object.namespace, scaled_object.name,
                            result.persistent, result.total_current_lag
                        );

                        // A failed send means the client has hung up
                        if sx.send(Ok(IsActiveResponse { result: result.persistent })).await.is_err() {
                            info!(
                                "StreamIsActive('{}/{}'): stream closed",
                                scaled_object.namespace, scaled_object.name
                            );
                            break;
                        }
                    },
                    _ = shutdown_token.cancelled() => {
                        info!(
                            "StreamIsActive('{}/{}'): received shutdown signal",
                            scaled_object.namespace, scaled_object.name
                        );
                        break;
                    },
                }
            }
        });

        Ok(Response::new(
            Box::pin(ReceiverStream::new(rx)) as Self::StreamIsActiveStream
        ))
    }

    async fn get_metric_spec(
        &self,
        _request: Request<ScaledObjectRef>,
    ) -> Result<Response<GetMetricSpecResponse>, Status> {
        Ok(Response::new(GetMetricSpecResponse {
            metric_specs: vec![MetricSpec {
                metric_name: PERSISTENT_LAG_METRIC.to_string(),
                target_size: self.config.lag_threshold,
            }],
        }))
    }

    async fn get_metrics(
        &self,
        request: Request<GetMetricsRequest>,
    ) -> Result<Response<GetMetricsResponse>, Status> {
        let result = self.evaluate().await;

        // The workload is reported only while the lag is persistent
        let metric_value = if result.persistent {
            result.total_current_lag
        } else {
            0
        };

        debug!(
            "GetMetrics('{}'): persistent={} metric_value={}",
            request.into_inner().metric_name,
            result.persistent,
            metric_value
        );

        Ok(Response::new(GetMetricsResponse {
            metric_values: vec![MetricValue {
                metric_name: PERSISTENT_LAG_METRIC.to_string(),
                metric_value,
            }],
        }))
    }
}
