// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Debounced preview rendering.
//
// Requests are coalesced until the input has been quiet for the configured
// period; only the newest request is rendered. Renders run on the blocking
// pool one at a time, and a result is dropped if a newer request arrived
// while it was being produced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A finished render tagged with the request generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<R> {
    pub generation: u64,
    pub output: R,
}

/// Last-write-wins render scheduler.
///
/// Dropping the scheduler flushes: a request still inside its quiet period
/// is rendered immediately, then the worker exits and the result channel
/// closes.
pub struct PreviewScheduler<T> {
    requests: mpsc::UnboundedSender<(u64, T)>,
    generation: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> PreviewScheduler<T> {
    /// Start the worker task. Must be called inside a tokio runtime.
    pub fn spawn<R, F>(quiet: Duration, render: F) -> (Self, mpsc::UnboundedReceiver<Rendered<R>>)
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        let (requests, incoming) = mpsc::unbounded_channel();
        let (results, outgoing) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));

        let worker = tokio::spawn(run_worker(
            incoming,
            results,
            quiet,
            Arc::new(render),
            Arc::clone(&generation),
        ));

        (
            Self {
                requests,
                generation,
                worker,
            },
            outgoing,
        )
    }

    /// Schedule a render of `job`, superseding anything not yet delivered.
    /// Returns the generation assigned to this request.
    pub fn request(&self, job: T) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.requests.send((generation, job)).is_err() {
            warn!(generation, "Preview worker has stopped; request dropped");
        }
        generation
    }

    /// Generation of the most recent request (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Flush any pending request and wait for the worker to finish.
    pub async fn shutdown(self) {
        let Self {
            requests, worker, ..
        } = self;
        drop(requests);
        if let Err(err) = worker.await {
            warn!(%err, "Preview worker ended abnormally");
        }
    }
}

async fn run_worker<T, R, F>(
    mut incoming: mpsc::UnboundedReceiver<(u64, T)>,
    results: mpsc::UnboundedSender<Rendered<R>>,
    quiet: Duration,
    render: Arc<F>,
    latest: Arc<AtomicU64>,
) where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    while let Some(mut pending) = incoming.recv().await {
        // Wait out the quiet period, restarting it on every newer request.
        loop {
            match tokio::time::timeout(quiet, incoming.recv()).await {
                Ok(Some(newer)) => pending = newer,
                Ok(None) | Err(_) => break,
            }
        }

        let (generation, job) = pending;
        let render = Arc::clone(&render);
        let output = match tokio::task::spawn_blocking(move || render(job)).await {
            Ok(output) => output,
            Err(err) => {
                warn!(generation, %err, "Preview render failed");
                continue;
            }
        };

        let newest = latest.load(Ordering::SeqCst);
        if generation != newest {
            debug!(generation, newest, "Discarding stale preview");
            continue;
        }
        if results.send(Rendered { generation, output }).is_err() {
            debug!("Preview receiver dropped; stopping worker");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(200);

    /// A burst of requests produces one render, of the last request.
    #[tokio::test(start_paused = true)]
    async fn burst_renders_only_the_last_request() {
        let (scheduler, mut rendered) = PreviewScheduler::spawn(QUIET, |n: u32| n * 10);

        for n in 1..=5 {
            scheduler.request(n);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let first = rendered.recv().await.expect("one render");
        assert_eq!(first, Rendered { generation: 5, output: 50 });

        let more = tokio::time::timeout(Duration::from_secs(2), rendered.recv()).await;
        assert!(more.is_err(), "no further renders expected");
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_requests_each_render() {
        let (scheduler, mut rendered) = PreviewScheduler::spawn(QUIET, |s: &'static str| s.len());

        scheduler.request("one");
        let a = rendered.recv().await.expect("first render");
        scheduler.request("three");
        let b = rendered.recv().await.expect("second render");

        assert_eq!(a, Rendered { generation: 1, output: 3 });
        assert_eq!(b, Rendered { generation: 2, output: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_renders_before_the_quiet_period() {
        let (scheduler, mut rendered) = PreviewScheduler::spawn(QUIET, |n: u8| n);
        scheduler.request(1);

        let early = tokio::time::timeout(Duration::from_millis(150), rendered.recv()).await;
        assert!(early.is_err());
        assert_eq!(rendered.recv().await.map(|r| r.output), Some(1));
    }

    /// Shutting down renders the pending request instead of losing it.
    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_request() {
        let (scheduler, mut rendered) = PreviewScheduler::spawn(QUIET, |n: i32| -n);
        assert_eq!(scheduler.generation(), 0);
        scheduler.request(7);
        assert_eq!(scheduler.generation(), 1);
        scheduler.shutdown().await;

        assert_eq!(rendered.recv().await, Some(Rendered { generation: 1, output: -7 }));
        assert_eq!(rendered.recv().await, None);
    }

    /// A request arriving while a render is in flight wins: the older
    /// result is dropped and only the newer one is delivered.
    #[tokio::test]
    async fn render_superseded_mid_flight_is_discarded() {
        let (started_tx, started_rx) = std::sync::mpsc::channel::<u32>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = std::sync::Mutex::new(release_rx);
        let (scheduler, mut rendered) =
            PreviewScheduler::spawn(Duration::from_millis(10), move |n: u32| {
                let _ = started_tx.send(n);
                if n == 1 {
                    release_rx
                        .lock()
                        .expect("release lock")
                        .recv()
                        .expect("released");
                }
                n * 10
            });

        scheduler.request(1);
        let started = tokio::task::spawn_blocking(move || started_rx.recv())
            .await
            .expect("join")
            .expect("first render started");
        assert_eq!(started, 1);

        scheduler.request(2);
        release_tx.send(()).expect("release first render");

        let delivered = tokio::time::timeout(Duration::from_secs(5), rendered.recv())
            .await
            .expect("a render is delivered");
        assert_eq!(delivered, Some(Rendered { generation: 2, output: 20 }));

        scheduler.shutdown().await;
        assert_eq!(rendered.recv().await, None);
    }
}
