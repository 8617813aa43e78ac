use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::ClientOptions;
use crate::message::Envelope;
use crate::receiver::functions::MessageHandler;
use crate::transport::Transport;

/// What happens to a message whose handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// Leave the message alone; the queue's own visibility timeout applies.
    Retain,
    /// Make the message visible again after the given number of seconds.
    Delay(i32),
    /// Make the message visible again right away.
    Immediate,
}

impl ReleasePolicy {
    pub fn from_options(options: &ClientOptions) -> Self {
        if options.prevent_visibility_timeout_removal {
            ReleasePolicy::Retain
        } else if let Some(seconds) = options.visibility_timeout_on_error {
            ReleasePolicy::Delay(seconds)
        } else {
            ReleasePolicy::Immediate
        }
    }
}

/// Result of running the handler against one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed,
    Failed,
}

/// The terminal action taken for one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The handler completed and the message was deleted.
    Deleted,
    /// The handler completed but the delete call failed.
    DeleteFailed,
    /// The handler failed and the visibility timeout was set to `seconds`.
    Released { seconds: i32 },
    /// The handler failed and the visibility change call failed.
    ReleaseFailed { seconds: i32 },
    /// The handler failed and the message was left for the queue to redeliver.
    Retained,
}

impl Disposition {
    pub fn outcome(&self) -> HandlerOutcome {
        match self {
            Disposition::Deleted | Disposition::DeleteFailed => HandlerOutcome::Completed,
            Disposition::Released { .. }
            | Disposition::ReleaseFailed { .. }
            | Disposition::Retained => HandlerOutcome::Failed,
        }
    }
}

/// Drives one envelope through decode, handler, and acknowledge or release.
pub struct LifecycleController<Tr: Transport> {
    transport: Arc<Tr>,
    release_policy: ReleasePolicy,
}

impl<Tr: Transport> LifecycleController<Tr> {
    pub fn new(transport: Arc<Tr>, release_policy: ReleasePolicy) -> Self {
        LifecycleController {
            transport,
            release_policy,
        }
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        self.release_policy
    }

    /// Handles one envelope to completion.
    ///
    /// Exactly one of delete, visibility change, or nothing is attempted.
    /// Errors from either remote call are logged and reported in the returned
    /// [`Disposition`], never propagated.
    pub async fn handle<T, H>(&self, envelope: Envelope, handler: &H) -> Disposition
    where
        T: DeserializeOwned + Send + 'static,
        H: MessageHandler<T> + ?Sized,
    {
        match run_handler(&envelope, handler).await {
            HandlerOutcome::Completed => self.acknowledge(&envelope).await,
            HandlerOutcome::Failed => self.release(&envelope).await,
        }
    }

    async fn acknowledge(&self, envelope: &Envelope) -> Disposition {
        match self.transport.delete(&envelope.receipt_handle).await {
            Ok(()) => Disposition::Deleted,
            Err(e) => {
                warn!(
                    message_id = ?envelope.message_id,
                    receipt_handle = %envelope.receipt_handle,
                    error = %e,
                    "failed to delete message"
                );
                Disposition::DeleteFailed
            }
        }
    }

    async fn release(&self, envelope: &Envelope) -> Disposition {
        let seconds = match self.release_policy {
            ReleasePolicy::Retain => return Disposition::Retained,
            ReleasePolicy::Delay(seconds) => seconds,
            ReleasePolicy::Immediate => 0,
        };

        match self
            .transport
            .change_visibility(&envelope.receipt_handle, seconds)
            .await
        {
            Ok(()) => Disposition::Released { seconds },
            Err(e) => {
                warn!(
                    message_id = ?envelope.message_id,
                    receipt_handle = %envelope.receipt_handle,
                    seconds,
                    error = %e,
                    "failed to change message visibility"
                );
                Disposition::ReleaseFailed { seconds }
            }
        }
    }
}

/// Decodes the body and invokes the handler. Decode errors, handler errors
/// and handler panics all count as a failure.
async fn run_handler<T, H>(envelope: &Envelope, handler: &H) -> HandlerOutcome
where
    T: DeserializeOwned + Send + 'static,
    H: MessageHandler<T> + ?Sized,
{
    let invocation = async {
        match serde_json::from_str::<T>(&envelope.body) {
            Ok(payload) => Ok(handler.handle(payload, envelope.clone()).await),
            Err(e) => Err(e),
        }
    };

    match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(Ok(Ok(()))) => HandlerOutcome::Completed,
        Ok(Err(e)) => {
            warn!(message_id = ?envelope.message_id, error = %e, "failed to decode message body");
            HandlerOutcome::Failed
        }
        Ok(Ok(Err(e))) => {
            debug!(message_id = ?envelope.message_id, error = %e, "handler failed");
            HandlerOutcome::Failed
        }
        Err(_) => {
            warn!(message_id = ?envelope.message_id, "handler panicked");
            HandlerOutcome::Failed
        }
    }
}
