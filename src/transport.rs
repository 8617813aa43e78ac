use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{MessageSystemAttributeName, SendMessageBatchRequestEntry};

use crate::client::create_sqs_client_from_env;
use crate::errors::SqsConsumerError;
use crate::message::{
    BatchEntryFailure, BatchEntrySuccess, BatchSendReceipt, Envelope, OutgoingMessage,
    SendReceipt,
};
use crate::receiver::config::ReceiveConfig;

/// Maximum number of entries SQS accepts in one batch request.
pub const MAX_BATCH_SIZE: usize = 10;

/// The remote operations the consumer needs from a queue, bound to one queue.
///
/// [`SqsTransport`] talks to AWS SQS. Any other implementation can be plugged
/// into [`crate::client::SqsClient::with_transport`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one serialized message.
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, SqsConsumerError>;

    /// Sends up to [`MAX_BATCH_SIZE`] serialized messages in one request.
    async fn send_batch(
        &self,
        messages: Vec<OutgoingMessage>,
    ) -> Result<BatchSendReceipt, SqsConsumerError>;

    /// Receives one batch. An empty vector means no messages were available.
    async fn receive(&self, config: &ReceiveConfig) -> Result<Vec<Envelope>, SqsConsumerError>;

    /// Deletes the delivery identified by `receipt_handle`.
    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsConsumerError>;

    /// Sets the visibility timeout of the delivery identified by `receipt_handle`.
    async fn change_visibility(
        &self,
        receipt_handle: &str,
        seconds: i32,
    ) -> Result<(), SqsConsumerError>;
}

/// A [`Transport`] backed by the AWS SQS client.
#[derive(Debug, Clone)]
pub struct SqsTransport {
    /// The AWS SQS client used to interact with the SQS service.
    sqs_client: aws_sdk_sqs::Client,

    /// The queue every call is addressed to.
    queue_url: String,
}

impl SqsTransport {
    pub fn new(sqs_client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        SqsTransport {
            sqs_client,
            queue_url: queue_url.into(),
        }
    }

    /// Addresses `queue_url` with a client resolved from the default AWS provider chain.
    pub async fn from_env(queue_url: impl Into<String>) -> Self {
        SqsTransport::new(create_sqs_client_from_env().await, queue_url)
    }

    pub fn sqs_client(&self) -> &aws_sdk_sqs::Client {
        &self.sqs_client
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl Transport for SqsTransport {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, SqsConsumerError> {
        let output = self
            .sqs_client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body)
            .set_delay_seconds(message.options.delay_seconds)
            .set_message_group_id(message.options.message_group_id)
            .set_message_deduplication_id(message.options.message_deduplication_id)
            .send()
            .await
            .map_err(|e| SqsConsumerError::transport("send", DisplayErrorContext(&e).to_string()))?;

        Ok(SendReceipt {
            message_id: output.message_id().map(ToOwned::to_owned),
            sequence_number: output.sequence_number().map(ToOwned::to_owned),
        })
    }

    async fn send_batch(
        &self,
        messages: Vec<OutgoingMessage>,
    ) -> Result<BatchSendReceipt, SqsConsumerError> {
        let entries = messages
            .into_iter()
            .enumerate()
            .map(|(i, message)| {
                SendMessageBatchRequestEntry::builder()
                    .id(i.to_string())
                    .message_body(message.body)
                    .set_delay_seconds(message.options.delay_seconds)
                    .set_message_group_id(message.options.message_group_id)
                    .set_message_deduplication_id(message.options.message_deduplication_id)
                    .build()
                    .map_err(|e| SqsConsumerError::transport("send_batch", e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .sqs_client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| {
                SqsConsumerError::transport("send_batch", DisplayErrorContext(&e).to_string())
            })?;

        Ok(BatchSendReceipt {
            successful: output
                .successful()
                .iter()
                .map(|entry| BatchEntrySuccess {
                    id: entry.id().to_string(),
                    message_id: entry.message_id().to_string(),
                })
                .collect(),
            failed: output
                .failed()
                .iter()
                .map(|entry| BatchEntryFailure {
                    id: entry.id().to_string(),
                    code: entry.code().to_string(),
                    message: entry.message().map(ToOwned::to_owned),
                    sender_fault: entry.sender_fault(),
                })
                .collect(),
        })
    }

    async fn receive(&self, config: &ReceiveConfig) -> Result<Vec<Envelope>, SqsConsumerError> {
        let attribute_names = config
            .attribute_names
            .iter()
            .map(|name| MessageSystemAttributeName::from(name.as_str()))
            .collect();

        let output = self
            .sqs_client
            .receive_message()
            .queue_url(&self.queue_url)
            .set_message_system_attribute_names(Some(attribute_names))
            .set_message_attribute_names(Some(config.message_attribute_names.clone()))
            .wait_time_seconds(config.wait_time_seconds)
            .set_max_number_of_messages(config.max_number_of_messages)
            .set_visibility_timeout(config.visibility_timeout)
            .send()
            .await
            .map_err(|e| {
                SqsConsumerError::transport("receive", DisplayErrorContext(&e).to_string())
            })?;

        Ok(output.messages().iter().map(Envelope::from).collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsConsumerError> {
        self.sqs_client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                SqsConsumerError::transport("delete", DisplayErrorContext(&e).to_string())
            })?;

        Ok(())
    }

    async fn change_visibility(
        &self,
        receipt_handle: &str,
        seconds: i32,
    ) -> Result<(), SqsConsumerError> {
        self.sqs_client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(seconds)
            .send()
            .await
            .map_err(|e| {
                SqsConsumerError::transport(
                    "change_visibility",
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        Ok(())
    }
}
