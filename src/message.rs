use std::collections::HashMap;

use aws_sdk_sqs::types::MessageAttributeValue;

/// One message delivery fetched from the queue.
///
/// The body stays opaque until the lifecycle controller decodes it for the
/// handler. The receipt handle identifies this specific delivery and is what
/// delete and visibility-change calls operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// The message ID assigned by SQS.
    pub message_id: Option<String>,

    /// The raw serialized payload.
    pub body: String,

    /// Handle authorizing deletion or visibility change of this delivery.
    pub receipt_handle: String,

    /// System attributes such as `ApproximateReceiveCount`, passed through unmodified.
    pub attributes: HashMap<String, String>,

    /// Custom message attributes, passed through unmodified.
    pub message_attributes: HashMap<String, MessageAttribute>,
}

/// A custom message attribute as SQS delivered it.
///
/// `data_type` is the full type label, e.g. `String`, `Number`, `Binary`
/// or a custom suffixed form such as `Binary.gzip`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAttribute {
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<Vec<u8>>,
}

impl MessageAttribute {
    /// A `String` typed attribute.
    pub fn string(value: impl Into<String>) -> Self {
        MessageAttribute {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A `Binary` typed attribute.
    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        MessageAttribute {
            data_type: "Binary".to_string(),
            binary_value: Some(value.into()),
            ..Default::default()
        }
    }
}

impl From<&MessageAttributeValue> for MessageAttribute {
    fn from(value: &MessageAttributeValue) -> Self {
        MessageAttribute {
            data_type: value.data_type().to_string(),
            string_value: value.string_value().map(ToOwned::to_owned),
            binary_value: value.binary_value().map(|blob| blob.as_ref().to_vec()),
            string_list_values: value.string_list_values().to_vec(),
            binary_list_values: value
                .binary_list_values()
                .iter()
                .map(|blob| blob.as_ref().to_vec())
                .collect(),
        }
    }
}

impl Envelope {
    /// Creates an envelope with the given body and receipt handle and no attributes.
    pub fn new(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Envelope {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            ..Default::default()
        }
    }
}

impl From<&aws_sdk_sqs::types::Message> for Envelope {
    fn from(message: &aws_sdk_sqs::types::Message) -> Self {
        let attributes = message
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(key, value)| (key.as_str().to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let message_attributes = message
            .message_attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(key, value)| (key.clone(), MessageAttribute::from(value)))
                    .collect()
            })
            .unwrap_or_default();

        Envelope {
            message_id: message.message_id().map(ToOwned::to_owned),
            body: message.body().unwrap_or_default().to_string(),
            receipt_handle: message.receipt_handle().unwrap_or_default().to_string(),
            attributes,
            message_attributes,
        }
    }
}

/// Per-call overrides merged into every send request or batch entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Seconds to delay delivery of the message.
    pub delay_seconds: Option<i32>,

    /// Message group for FIFO queues.
    pub message_group_id: Option<String>,

    /// Deduplication token for FIFO queues.
    pub message_deduplication_id: Option<String>,
}

impl SendOptions {
    pub fn delay_seconds(mut self, value: i32) -> Self {
        self.delay_seconds = Some(value);
        self
    }

    pub fn message_group_id(mut self, value: impl Into<String>) -> Self {
        self.message_group_id = Some(value.into());
        self
    }

    pub fn message_deduplication_id(mut self, value: impl Into<String>) -> Self {
        self.message_deduplication_id = Some(value.into());
        self
    }
}

/// A serialized body together with the options it should be sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub body: String,
    pub options: SendOptions,
}

/// Result of a single send call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
    pub sequence_number: Option<String>,
}

/// Result of a batch send call.
///
/// Entry ids are the positions of the payloads in the submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSendReceipt {
    pub successful: Vec<BatchEntrySuccess>,
    pub failed: Vec<BatchEntryFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntrySuccess {
    pub id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntryFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}
