use crate::errors::SqsConsumerError;
use crate::message::Envelope;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;

/// Trait for user-supplied message handlers.
///
/// The handler is invoked once per received envelope with the JSON-decoded
/// body and the envelope itself. Returning `Ok(())` acknowledges the message;
/// returning an error or panicking releases it back to the queue.
///
/// # Type Parameters
///
/// * `T` - The type the message body is decoded into
#[async_trait]
pub trait MessageHandler<T>: Send + Sync + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    /// Processes one decoded message.
    ///
    /// # Arguments
    ///
    /// * `payload` - The decoded message body
    /// * `envelope` - The delivery the payload was decoded from
    async fn handle(&self, payload: T, envelope: Envelope) -> Result<(), SqsConsumerError>;
}

/// Adapter that turns an async closure into a [`MessageHandler`].
///
/// # Type Parameters
///
/// * `F` - The message handler function type
/// * `Fut` - The future returned by the handler function
/// * `T` - The type the message body is decoded into
pub struct HandlerFn<F, Fut, T>
where
    F: Fn(T, Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsConsumerError>> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    handler_fn: F,
    _payload: PhantomData<fn(T) -> Fut>,
}

impl<F, Fut, T> HandlerFn<F, Fut, T>
where
    F: Fn(T, Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsConsumerError>> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    /// Wraps `handler_fn` so it can be passed to the poll loop.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rs_sqs_consumer::receiver::HandlerFn;
    ///
    /// let handler = HandlerFn::new(|payload: serde_json::Value, _envelope| async move {
    ///     println!("Processing message: {}", payload);
    ///     Ok(())
    /// });
    /// # let _ = handler;
    /// ```
    pub fn new(handler_fn: F) -> Self {
        HandlerFn {
            handler_fn,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T> MessageHandler<T> for HandlerFn<F, Fut, T>
where
    F: Fn(T, Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SqsConsumerError>> + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    async fn handle(&self, payload: T, envelope: Envelope) -> Result<(), SqsConsumerError> {
        (self.handler_fn)(payload, envelope).await
    }
}
