//! Input feeder.
//!
//! Pushes the fetch requests of a sprite onto the bounded work queue in
//! increasing timecode order. A full queue makes the feeder wait, so the
//! number of requests in flight stays proportional to the worker count.

use async_channel::Sender;
use tokio::task::JoinHandle;

use crate::progress::Shutdown;
use crate::request::FetchRequest;

/// Spawn the feeder task.
///
/// The task resolves to the number of requests it managed to enqueue. It
/// stops early, without error, when every worker is gone or `shutdown` is
/// raised; the coordinator already knows why. Dropping `queue` on exit
/// closes the work queue so idle workers terminate.
pub(crate) fn spawn_feeder<I>(requests: I, queue: Sender<FetchRequest>, shutdown: Shutdown) -> JoinHandle<usize>
where
    I: IntoIterator<Item = FetchRequest>,
    I::IntoIter: Send + 'static,
{
    let requests = requests.into_iter();
    tokio::spawn(async move {
        let mut sent = 0;
        for request in requests {
            tokio::select! {
                biased;
                _ = shutdown.raised() => {
                    log::debug!("Feeder stopping after {sent} request(s): shutdown raised");
                    break;
                }
                pushed = queue.send(request) => {
                    if pushed.is_err() {
                        log::debug!("Feeder stopping after {sent} request(s): no worker left");
                        break;
                    }
                    sent += 1;
                }
            }
        }
        sent
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::progress::CancellationToken;
    use crate::request::GenerationRequest;

    fn requests(count: u64) -> Vec<FetchRequest> {
        GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(1))
            .with_range(Duration::ZERO, Duration::from_secs(count - 1))
            .fetch_requests("http://packager/thumb/movie")
            .collect()
    }

    #[tokio::test]
    async fn emits_every_request_in_order() {
        let (sender, receiver) = async_channel::bounded(2);
        let shutdown = Shutdown::new(CancellationToken::new());
        let feeder = spawn_feeder(requests(10), sender, shutdown);

        let mut timecodes = Vec::new();
        while let Ok(request) = receiver.recv().await {
            timecodes.push(request.timecode);
        }

        assert_eq!(feeder.await.unwrap(), 10);
        assert_eq!(timecodes, (0..10).map(Duration::from_secs).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn blocks_on_full_queue_until_aborted() {
        let (sender, receiver) = async_channel::bounded(2);
        let shutdown = Shutdown::new(CancellationToken::new());
        let feeder = spawn_feeder(requests(10), sender, shutdown.clone());

        // Nobody consumes: the feeder fills the queue and waits.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(receiver.len(), 2);
        assert!(!feeder.is_finished());

        shutdown.abort();
        let sent = tokio::time::timeout(Duration::from_secs(5), feeder)
            .await
            .expect("feeder should stop once aborted")
            .unwrap();
        assert_eq!(sent, 2);
        assert!(receiver.is_closed());
    }

    #[tokio::test]
    async fn stops_when_workers_are_gone() {
        let (sender, receiver) = async_channel::bounded(1);
        drop(receiver);
        let shutdown = Shutdown::new(CancellationToken::new());
        let sent = spawn_feeder(requests(5), sender, shutdown).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn cancelled_token_stops_feeder_before_emitting() {
        let token = CancellationToken::new();
        token.cancel();
        let (sender, receiver) = async_channel::bounded(4);
        let sent = spawn_feeder(requests(5), sender, Shutdown::new(token))
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert!(receiver.is_empty());
    }
}
