use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;
use tokio::time::Duration;

use crate::lag_samples::LagSample;

/// Time-bounded, append-only store of recent [`LagSample`]s.
///
/// The window duration is `window_size x sampling_interval`. Samples are
/// appended in arrival order (oldest first), and every append evicts the
/// prefix of samples that has aged out of the window. Eviction is driven by
/// sample timestamps, not by count: one scrape produces one sample per
/// Partition, and a count-based bound would discard Partitions unevenly.
///
/// It exposes the accessor methods via an async interface, while dealing
/// internally with concurrency and synchronization.
#[derive(Debug)]
pub struct SlidingWindow {
    window_duration: ChronoDuration,
    samples: RwLock<Vec<LagSample>>,
}

impl SlidingWindow {
    /// Create a new, empty [`SlidingWindow`].
    ///
    /// # Arguments
    ///
    /// * `window_size` - Window duration, expressed as a multiple of `sampling_interval`
    /// * `sampling_interval` - How often a new batch of samples is expected
    pub fn new(window_size: usize, sampling_interval: Duration) -> Self {
        let window_duration = ChronoDuration::from_std(sampling_interval * window_size as u32)
            .expect("Window duration out of range - this should never happen");

        Self {
            window_duration,
            samples: RwLock::new(Vec::new()),
        }
    }

    /// Append the given samples, then evict every sample older than the window.
    ///
    /// The eviction cutoff is read once, right after the append: adding samples
    /// that are already older than the window is allowed, and amounts to a
    /// no-op with respect to the visible content.
    pub async fn add(&self, samples: Vec<LagSample>) {
        let mut w_guard = self.samples.write().await;
        w_guard.extend(samples);

        // Samples are appended in arrival order, so the aged-out ones
        // form a prefix: scan from the front up to the first retained.
        let cutoff = Utc::now() - self.window_duration;
        let expired = w_guard.iter().take_while(|s| s.read_datetime < cutoff).count();
        if expired > 0 {
            w_guard.drain(..expired);
        }
    }

    /// Returns an independent copy of the current window content.
    ///
    /// Mutating the returned [`Vec`] does not affect the window.
    pub async fn snapshot(&self) -> Vec<LagSample> {
        self.samples.read().await.clone()
    }

    /// Number of samples currently retained.
    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;

    fn sample(at: chrono::DateTime<Utc>, partition: i32, lag: i64) -> LagSample {
        LagSample {
            read_datetime: at,
            topic: "test-topic".to_string(),
            partition,
            lag,
            committed_offset: 0,
            end_offset: lag,
        }
    }

    #[tokio::test]
    async fn add_and_snapshot() {
        let w = SlidingWindow::new(10, Duration::from_secs(1)); //< 10s window

        let now = Utc::now();
        w.add(vec![sample(now, 0, 100)]).await;
        w.add(vec![sample(now, 1, 200)]).await;

        let snap = w.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].lag, 100);
        assert_eq!(snap[1].lag, 200);
    }

    #[tokio::test]
    async fn add_whole_batches() {
        let w = SlidingWindow::new(10, Duration::from_secs(1));

        let now = Utc::now();
        w.add(vec![sample(now, 0, 10), sample(now, 1, 20), sample(now, 2, 30)]).await;

        assert_eq!(w.len().await, 3);
    }

    #[tokio::test]
    async fn evicts_samples_older_than_the_window() {
        let w = SlidingWindow::new(5, Duration::from_secs(1)); //< 5s window

        let now = Utc::now();

        // Samples already older than the window are evicted on `add`
        w.add(vec![
            sample(now - ChronoDuration::seconds(10), 0, 100),
            sample(now - ChronoDuration::seconds(8), 0, 200),
        ])
        .await;
        assert_eq!(w.len().await, 0);

        // A mix of aged-out and fresh samples: only the fresh ones survive
        w.add(vec![
            sample(now - ChronoDuration::seconds(10), 0, 100),
            sample(now - ChronoDuration::seconds(3), 0, 200),
            sample(now, 0, 300),
        ])
        .await;

        let snap = w.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].lag, 200);
        assert_eq!(snap[1].lag, 300);
    }

    #[tokio::test]
    async fn keeps_samples_within_the_window() {
        let w = SlidingWindow::new(30, Duration::from_secs(1)); //< 30s window

        let now = Utc::now();
        for i in 0..10 {
            w.add(vec![sample(now + ChronoDuration::seconds(-9 + i), 0, i * 100)]).await;
        }

        assert_eq!(w.len().await, 10);
    }

    #[tokio::test]
    async fn snapshot_is_an_independent_copy() {
        let w = SlidingWindow::new(10, Duration::from_secs(1));

        w.add(vec![sample(Utc::now(), 0, 100)]).await;

        let mut snap = w.snapshot().await;
        snap[0].lag = 999;

        assert_eq!(w.snapshot().await[0].lag, 100);
    }

    #[tokio::test]
    async fn len_matches_snapshot() {
        let w = SlidingWindow::new(10, Duration::from_secs(1));
        assert_eq!(w.len().await, 0);

        let now = Utc::now();
        w.add(vec![sample(now, 0, 1), sample(now, 1, 2)]).await;

        assert_eq!(w.len().await, w.snapshot().await.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers() {
        // Window large enough that nothing is evicted
        let w = Arc::new(SlidingWindow::new(60, Duration::from_secs(1)));

        let now = Utc::now();
        let mut tasks = Vec::new();

        // 10 tasks writing concurrently
        for id in 0..10 {
            let w = w.clone();
            tasks.push(tokio::spawn(async move {
                for j in 0..100 {
                    w.add(vec![sample(now + ChronoDuration::milliseconds(j), id, j)]).await;
                }
            }));
        }

        // 5 tasks reading concurrently
        for _ in 0..5 {
            let w = w.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    let snap = w.snapshot().await;
                    assert!(snap.len() <= 1000);
                    let _ = w.len().await;
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        // All samples are in: 10 writers x 100 samples each
        assert_eq!(w.len().await, 1000);
    }
}
