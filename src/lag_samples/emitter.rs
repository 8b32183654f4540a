use async_trait::async_trait;
use rdkafka::ClientConfig;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::fetcher::LagFetcher;
use super::sample::LagSample;
use crate::internals::Emitter;

const CHANNEL_SIZE: usize = 5;

/// Emits batches of [`LagSample`]s via a provided [`mpsc::channel`].
///
/// It wraps a [`LagFetcher`], queries it once per sampling interval, and emits
/// the whole per-partition batch it returns. The first fetch happens right
/// away, so the window starts filling during the first interval. A failed
/// fetch is logged and skipped: the next tick queries the Cluster again.
///
/// It shuts down when the provided [`CancellationToken`] is cancelled.
pub struct LagSamplesEmitter {
    client_config: ClientConfig,
    topic: String,
    consumer_group: String,
    sampling_interval: Duration,
}

impl LagSamplesEmitter {
    /// Create a new [`LagSamplesEmitter`].
    ///
    /// # Arguments
    ///
    /// * `client_config` - Kafka client configuration, used to query the Cluster for the Consumer Group lag
    /// * `topic` - Topic to observe
    /// * `consumer_group` - Consumer Group whose committed offsets define the lag
    /// * `sampling_interval` - How often to query the Cluster
    pub fn new(
        client_config: ClientConfig,
        topic: String,
        consumer_group: String,
        sampling_interval: Duration,
    ) -> Self {
        Self {
            client_config,
            topic,
            consumer_group,
            sampling_interval,
        }
    }
}

#[async_trait]
impl Emitter for LagSamplesEmitter {
    type Emitted = Vec<LagSample>;

    /// Spawn a new async task to run the business logic of this struct.
    ///
    /// When this emitter gets spawned, it returns a [`mpsc::Receiver`] for
    /// batches of [`LagSample`]s, and a [`JoinHandle`] to help join on the
    /// task spawned internally.
    ///
    /// # Arguments
    ///
    /// * `shutdown_token`: A [`CancellationToken`] that, when cancelled, will make the internal loop terminate.
    ///
    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>) {
        let fetcher = LagFetcher::new(
            self.client_config.clone(),
            self.topic.clone(),
            self.consumer_group.clone(),
        )
        .expect("Failed to allocate Kafka Consumer");

        let (sx, rx) = mpsc::channel::<Self::Emitted>(CHANNEL_SIZE);

        let sampling_interval = self.sampling_interval;
        let join_handle = tokio::spawn(async move {
            // The first fetch happens immediately: the first tick is scheduled a
            // whole interval later. Ticks falling due while a fetch is still in
            // progress are coalesced into one.
            let mut interval = interval_at(Instant::now() + sampling_interval, sampling_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                match fetcher.fetch_lag() {
                    Ok(samples) => {
                        trace!("Fetched lag of {} partitions", samples.len());

                        tokio::select! {
                            res = Self::emit_with_interval(&sx, samples, &mut interval) => {
                                if let Err(e) = res {
                                    error!("Failed to emit {}: {e}", std::any::type_name::<Self::Emitted>());
                                }
                            },
                            _ = shutdown_token.cancelled() => {
                                info!("Received shutdown signal");
                                break;
                            },
                        }
                    },
                    Err(e) => {
                        // No retry, no backoff: the next tick covers for this one
                        error!("Failed to fetch consumer group lag: {e}");

                        tokio::select! {
                            _ = interval.tick() => {},
                            _ = shutdown_token.cancelled() => {
                                info!("Received shutdown signal");
                                break;
                            },
                        }
                    },
                }
            }
        });

        (rx, join_handle)
    }
}
