use std::sync::{Arc, OnceLock};

use aws_config::Region;
use aws_sdk_sqs::config::{BehaviorVersion, SharedCredentialsProvider};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::SqsConsumerError;
use crate::message::{BatchSendReceipt, Envelope, OutgoingMessage, SendOptions, SendReceipt};
use crate::receiver::{
    Disposition, HandlerFn, LifecycleController, MessageHandler, PollHandle, PollScheduler,
    ReceiveConfig, ReceiveOptions, ReleasePolicy,
};
use crate::transport::{MAX_BATCH_SIZE, SqsTransport, Transport};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-standard";

/// Constructor configuration for [`SqsClient`].
///
/// `access_key_id`, `secret_access_key` and `queue` are required; every
/// constructor runs [`ClientOptions::validate`] before touching the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// The AWS region, `"us-standard"` when absent.
    pub region: Option<String>,

    /// The AWS access key ID.
    pub access_key_id: Option<String>,

    /// The AWS secret access key.
    pub secret_access_key: Option<String>,

    /// The URL of the queue to send to and poll from.
    pub queue: Option<String>,

    /// Endpoint override, e.g. a LocalStack URL.
    pub endpoint_url: Option<String>,

    /// When set, a failed message is left untouched and becomes visible
    /// again only after the queue's own visibility timeout.
    pub prevent_visibility_timeout_removal: bool,

    /// Visibility timeout, in seconds, applied to a failed message.
    /// A failed message is made visible immediately when absent.
    pub visibility_timeout_on_error: Option<i32>,
}

impl ClientOptions {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        ClientOptions {
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            queue: Some(queue.into()),
            ..Default::default()
        }
    }

    /// Reads options from the environment.
    ///
    /// This function reads the following variables:
    /// - `AWS_REGION`
    /// - `AWS_ACCESS_KEY_ID`
    /// - `AWS_SECRET_ACCESS_KEY`
    /// - `SQS_QUEUE_URL`
    /// - `SQS_ENDPOINT_URL`
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        ClientOptions {
            region: var("AWS_REGION"),
            access_key_id: var("AWS_ACCESS_KEY_ID"),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            queue: var("SQS_QUEUE_URL"),
            endpoint_url: var("SQS_ENDPOINT_URL"),
            ..Default::default()
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn prevent_visibility_timeout_removal(mut self, value: bool) -> Self {
        self.prevent_visibility_timeout_removal = value;
        self
    }

    pub fn visibility_timeout_on_error(mut self, seconds: i32) -> Self {
        self.visibility_timeout_on_error = Some(seconds);
        self
    }

    /// The configured region, or [`DEFAULT_REGION`].
    pub fn effective_region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Fails with [`SqsConsumerError::Configuration`] when a required field is missing.
    pub fn validate(&self) -> Result<(), SqsConsumerError> {
        let missing: Vec<&str> = [
            ("accessKeyId", &self.access_key_id),
            ("secretAccessKey", &self.secret_access_key),
            ("queue", &self.queue),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SqsConsumerError::Configuration(missing.join(", ")))
        }
    }
}

/// Builds an SQS client from the default AWS provider chain (environment,
/// profile, instance metadata). Backs [`SqsTransport::from_env`].
pub async fn create_sqs_client_from_env() -> aws_sdk_sqs::Client {
    let config = aws_config::load_from_env().await;
    aws_sdk_sqs::Client::new(&config)
}

/// Creates an AWS SQS client with explicitly provided credentials and region.
///
/// # Arguments
///
/// * `access_key_id` - The AWS access key ID
/// * `secret_access_key` - The AWS secret access key
/// * `region` - The AWS region (e.g., "us-east-1", "eu-west-1")
/// * `endpoint_url` - Optional endpoint override, e.g. for LocalStack
pub fn create_sqs_client_with_credentials(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
    endpoint_url: Option<&str>,
) -> aws_sdk_sqs::Client {
    let credentials =
        aws_sdk_sqs::config::Credentials::new(access_key_id, secret_access_key, None, None, "static");

    let shared_credentials = SharedCredentialsProvider::new(credentials);

    let mut builder = aws_sdk_sqs::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(shared_credentials);
    builder.set_endpoint_url(endpoint_url.map(ToOwned::to_owned));

    aws_sdk_sqs::Client::from_conf(builder.build())
}

/// Configuration and loop handle captured by the first `poll_queue` call.
struct PollLatch {
    config: ReceiveConfig,
    handle: PollHandle,
}

/// A queue client that sends messages and runs the consume loop.
///
/// # Example
///
/// ```rust,no_run
/// use rs_sqs_consumer::{ClientOptions, ReceiveOptions, SendOptions, SqsClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), rs_sqs_consumer::errors::SqsConsumerError> {
///     let client = SqsClient::new(ClientOptions::from_env())?;
///
///     client
///         .send_message(&serde_json::json!({ "type": "created" }), SendOptions::default())
///         .await?;
///
///     let handle = client.poll_queue_fn(
///         ReceiveOptions::default(),
///         |payload: serde_json::Value, _envelope| async move {
///             println!("Processing message: {}", payload);
///             Ok(())
///         },
///     );
///
///     tokio::signal::ctrl_c().await.ok();
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct SqsClient<Tr: Transport = SqsTransport> {
    options: ClientOptions,
    transport: Arc<Tr>,
    controller: Arc<LifecycleController<Tr>>,
    poll: OnceLock<PollLatch>,
}

impl SqsClient<SqsTransport> {
    /// Validates `options` and builds a client talking to AWS SQS.
    ///
    /// No remote call is made and polling does not start.
    pub fn new(options: ClientOptions) -> Result<Self, SqsConsumerError> {
        options.validate()?;

        let sqs_client = create_sqs_client_with_credentials(
            options.access_key_id.as_deref().unwrap_or_default(),
            options.secret_access_key.as_deref().unwrap_or_default(),
            options.effective_region(),
            options.endpoint_url.as_deref(),
        );
        let transport = SqsTransport::new(sqs_client, options.queue.clone().unwrap_or_default());

        Self::with_transport(options, transport)
    }
}

impl<Tr: Transport> SqsClient<Tr> {
    /// Validates `options` and builds a client on top of `transport`.
    pub fn with_transport(options: ClientOptions, transport: Tr) -> Result<Self, SqsConsumerError> {
        options.validate()?;

        let transport = Arc::new(transport);
        let controller = Arc::new(LifecycleController::new(
            Arc::clone(&transport),
            ReleasePolicy::from_options(&options),
        ));

        Ok(SqsClient {
            options,
            transport,
            controller,
            poll: OnceLock::new(),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    /// The receive configuration latched by the first [`SqsClient::poll_queue`] call.
    pub fn receive_config(&self) -> Option<&ReceiveConfig> {
        self.poll.get().map(|latch| &latch.config)
    }

    /// Serializes `payload` as JSON and sends it.
    ///
    /// Fails with [`SqsConsumerError::InvalidPayload`] before any remote call
    /// when the payload serializes to `null`.
    pub async fn send_message<P>(
        &self,
        payload: &P,
        options: SendOptions,
    ) -> Result<SendReceipt, SqsConsumerError>
    where
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_string(payload)?;
        if body == "null" {
            return Err(SqsConsumerError::InvalidPayload(
                "messages must have a payload".to_string(),
            ));
        }

        self.transport.send(OutgoingMessage { body, options }).await
    }

    /// Serializes each payload independently and sends them in one batch request.
    ///
    /// `options` is applied to every entry. A batch must hold between one and
    /// [`MAX_BATCH_SIZE`] payloads.
    pub async fn send_message_batch<P>(
        &self,
        payloads: &[P],
        options: SendOptions,
    ) -> Result<BatchSendReceipt, SqsConsumerError>
    where
        P: Serialize,
    {
        if payloads.is_empty() {
            return Err(SqsConsumerError::InvalidPayload(
                "a batch must contain at least one payload".to_string(),
            ));
        }
        if payloads.len() > MAX_BATCH_SIZE {
            return Err(SqsConsumerError::InvalidPayload(format!(
                "a batch holds at most {MAX_BATCH_SIZE} payloads, got {}",
                payloads.len()
            )));
        }

        let messages = payloads
            .iter()
            .map(|payload| {
                Ok(OutgoingMessage {
                    body: serde_json::to_string(payload)?,
                    options: options.clone(),
                })
            })
            .collect::<Result<Vec<_>, SqsConsumerError>>()?;

        self.transport.send_batch(messages).await
    }

    /// Starts the never-ending consume loop on the current tokio runtime.
    ///
    /// The first call latches `options` and `handler`; later calls leave the
    /// running loop untouched and return a handle to it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn poll_queue<T, H>(&self, options: ReceiveOptions, handler: H) -> PollHandle
    where
        T: DeserializeOwned + Send + 'static,
        H: MessageHandler<T>,
    {
        if let Some(latch) = self.poll.get() {
            debug!("poll loop already running, ignoring new options and handler");
            return latch.handle.clone();
        }

        let latch = self.poll.get_or_init(|| {
            let config = ReceiveConfig::from_options(options);
            debug!(?config, queue = ?self.options.queue, "starting poll loop");

            let scheduler = PollScheduler::new(
                Arc::clone(&self.transport),
                Arc::clone(&self.controller),
                handler,
                config.clone(),
            );
            let handle = scheduler.spawn(CancellationToken::new());

            PollLatch { config, handle }
        });

        latch.handle.clone()
    }

    /// [`SqsClient::poll_queue`] with an async closure as the handler.
    pub fn poll_queue_fn<T, F, Fut>(&self, options: ReceiveOptions, handler_fn: F) -> PollHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T, Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SqsConsumerError>> + Send + 'static,
    {
        self.poll_queue(options, HandlerFn::new(handler_fn))
    }

    /// Runs one envelope through decode, handler, and acknowledge or release.
    pub async fn handle_message<T, H>(&self, envelope: Envelope, handler: &H) -> Disposition
    where
        T: DeserializeOwned + Send + 'static,
        H: MessageHandler<T> + ?Sized,
    {
        self.controller.handle::<T, H>(envelope, handler).await
    }

    /// Deletes the delivery identified by `receipt_handle`.
    pub async fn delete_message(&self, receipt_handle: &str) -> Result<(), SqsConsumerError> {
        self.transport.delete(receipt_handle).await
    }

    /// Sets the visibility timeout of the delivery identified by `receipt_handle`.
    pub async fn change_visibility_timeout(
        &self,
        receipt_handle: &str,
        seconds: i32,
    ) -> Result<(), SqsConsumerError> {
        self.transport.change_visibility(receipt_handle, seconds).await
    }

    /// Makes `envelope` visible to other consumers right away.
    pub async fn remove_visibility_timeout(
        &self,
        envelope: &Envelope,
    ) -> Result<(), SqsConsumerError> {
        self.change_visibility_timeout(&envelope.receipt_handle, 0)
            .await
    }
}
