use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::message::Envelope;
use crate::receiver::config::ReceiveConfig;
use crate::receiver::functions::MessageHandler;
use crate::receiver::lifecycle::{Disposition, LifecycleController};
use crate::transport::Transport;

/// Handle to a running poll loop.
///
/// Cloning the handle is cheap; every clone controls the same loop.
#[derive(Debug, Clone)]
pub struct PollHandle {
    cancel: CancellationToken,
    finished: CancellationToken,
}

impl PollHandle {
    fn new(cancel: CancellationToken) -> Self {
        PollHandle {
            cancel,
            finished: CancellationToken::new(),
        }
    }

    /// Asks the loop to stop after the batch in flight and waits until it has.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.finished.cancelled().await;
    }

    /// Returns `true` once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// The token the loop watches; cancelling it stops the loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Summary of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub released: usize,
    pub release_failed: usize,
    pub retained: usize,
    pub aborted: usize,
}

impl BatchReport {
    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Deleted => self.deleted += 1,
            Disposition::DeleteFailed => self.delete_failed += 1,
            Disposition::Released { .. } => self.released += 1,
            Disposition::ReleaseFailed { .. } => self.release_failed += 1,
            Disposition::Retained => self.retained += 1,
        }
    }
}

/// The outer control loop: receive a batch, fan it out, wait for every
/// message to settle, repeat.
pub struct PollScheduler<Tr, H, T>
where
    Tr: Transport,
    H: MessageHandler<T>,
    T: DeserializeOwned + Send + 'static,
{
    transport: Arc<Tr>,
    controller: Arc<LifecycleController<Tr>>,
    handler: Arc<H>,
    config: ReceiveConfig,
    _payload: PhantomData<fn() -> T>,
}

impl<Tr, H, T> PollScheduler<Tr, H, T>
where
    Tr: Transport,
    H: MessageHandler<T>,
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(
        transport: Arc<Tr>,
        controller: Arc<LifecycleController<Tr>>,
        handler: H,
        config: ReceiveConfig,
    ) -> Self {
        PollScheduler {
            transport,
            controller,
            handler: Arc::new(handler),
            config,
            _payload: PhantomData,
        }
    }

    /// Spawns the loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> PollHandle {
        let handle = PollHandle::new(cancel);
        let loop_handle = handle.clone();

        tokio::spawn(async move {
            let _finished = loop_handle.finished.clone().drop_guard();
            self.run(loop_handle.cancel.clone()).await;
        });

        handle
    }

    /// Runs the loop until `cancel` fires. Without a cancellation this never returns.
    ///
    /// A failed receive counts as an empty batch and the next receive follows
    /// after a single `yield_now`, with no backoff. While the queue stays
    /// unreachable (bad credentials, wrong URL) the loop keeps retrying and
    /// logs one `warn!` per attempt, so expect a steady stream of
    /// `failed to receive messages` lines until the cause is fixed or the
    /// handle is shut down.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.transport.receive(&self.config) => received,
            };

            let envelopes = match received {
                Ok(envelopes) => envelopes,
                Err(e) => {
                    warn!(error = %e, "failed to receive messages");
                    Vec::new()
                }
            };

            let report = self.process_batch(envelopes).await;
            if report.received > 0 {
                debug!(
                    received = report.received,
                    deleted = report.deleted,
                    released = report.released,
                    retained = report.retained,
                    failed_acks = report.delete_failed + report.release_failed,
                    "batch settled"
                );
            }

            tokio::task::yield_now().await;
        }

        debug!("poll loop stopped");
    }

    /// Handles every envelope of one batch on its own task and waits for all of them.
    pub async fn process_batch(&self, envelopes: Vec<Envelope>) -> BatchReport {
        let mut report = BatchReport {
            received: envelopes.len(),
            ..Default::default()
        };

        let tasks = envelopes.into_iter().map(|envelope| {
            let controller = Arc::clone(&self.controller);
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move { controller.handle::<T, H>(envelope, handler.as_ref()).await })
        });

        for settled in join_all(tasks).await {
            match settled {
                Ok(disposition) => report.record(disposition),
                Err(e) => {
                    error!(error = %e, "message task did not complete");
                    report.aborted += 1;
                }
            }
        }

        report
    }
}
