use async_trait::async_trait;
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
    time::Interval,
};
use tokio_util::sync::CancellationToken;

/// Type that emits a [`Send`]-able object via a [`mpsc::Receiver`].
/// Use this when you expect to have a single receiver.
///
/// It terminates itself when the given [`CancellationToken`] is cancelled.
///
/// Awaiting for its termination should be done via the returned [`JoinHandle`].
#[async_trait]
pub trait Emitter {
    type Emitted: Send;

    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>);

    /// Emit the given object via the given [`mpsc::Sender`], then await the
    /// next tick of the given [`Interval`].
    ///
    /// This paces an emitting loop: emit, then hold until the interval expires.
    async fn emit_with_interval(
        sx: &mpsc::Sender<Self::Emitted>,
        to_emit: Self::Emitted,
        interval: &mut Interval,
    ) -> Result<(), SendError<Self::Emitted>> {
        let res = sx.send(to_emit).await;

        interval.tick().await;

        res
    }
}
