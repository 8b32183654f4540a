// Inner modules
mod evaluator;
mod register;

// Exports
pub use evaluator::{evaluate_persistence, EvaluationResult};
pub use register::SlidingWindow;

// Imports
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::time::Duration;

use crate::lag_samples::LagSample;

pub fn init(
    window_size: usize,
    sampling_interval: Duration,
    mut rx: Receiver<Vec<LagSample>>,
) -> Arc<SlidingWindow> {
    let window = Arc::new(SlidingWindow::new(window_size, sampling_interval));

    // The window is essentially "self updating" its data, by listening
    // on a channel for batches of samples.
    //
    // The internal async task will terminate when the `Receiver` `rx`
    // receives `None`. And, in turn, that will happen when the `Sender`
    // part of the channel is dropped.
    let window_clone = window.clone();
    tokio::spawn(async move {
        debug!("Begin receiving LagSample batches");

        while let Some(samples) = rx.recv().await {
            let batch_len = samples.len();
            window_clone.add(samples).await;

            debug!("Appended {} lag samples (retained: {})", batch_len, window_clone.len().await);
        }
    });

    debug!("Initialized");
    window
}
