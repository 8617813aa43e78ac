#![allow(dead_code)]

use async_trait::async_trait;
use rs_sqs_consumer::errors::SqsConsumerError;
use rs_sqs_consumer::message::{
    BatchEntrySuccess, BatchSendReceipt, Envelope, OutgoingMessage, SendReceipt,
};
use rs_sqs_consumer::receiver::ReceiveConfig;
use rs_sqs_consumer::{ClientOptions, SqsClient, Transport};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls observed by a [`RecordingTransport`].
#[derive(Debug, Default)]
pub struct Calls {
    pub sent: Vec<OutgoingMessage>,
    pub batches: Vec<Vec<OutgoingMessage>>,
    pub receives: usize,
    pub last_receive_config: Option<ReceiveConfig>,
    pub deleted: Vec<String>,
    pub visibility_changes: Vec<(String, i32)>,
}

#[derive(Debug, Default)]
struct Script {
    batches: VecDeque<Result<Vec<Envelope>, String>>,
    fail_sends: bool,
    fail_deletes: bool,
    fail_visibility_changes: bool,
}

/// In-memory transport that records every call and replays scripted batches.
///
/// Once the scripted batches run out every receive returns an empty batch.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Calls>>,
    script: Arc<Mutex<Script>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, envelopes: Vec<Envelope>) -> &Self {
        self.script.lock().unwrap().batches.push_back(Ok(envelopes));
        self
    }

    pub fn push_receive_error(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .batches
            .push_back(Err(message.to_string()));
        self
    }

    pub fn fail_sends(&self) -> &Self {
        self.script.lock().unwrap().fail_sends = true;
        self
    }

    pub fn fail_deletes(&self) -> &Self {
        self.script.lock().unwrap().fail_deletes = true;
        self
    }

    pub fn fail_visibility_changes(&self) -> &Self {
        self.script.lock().unwrap().fail_visibility_changes = true;
        self
    }

    pub fn with_calls<R>(&self, f: impl FnOnce(&Calls) -> R) -> R {
        f(&self.calls.lock().unwrap())
    }

    pub fn receive_count(&self) -> usize {
        self.with_calls(|c| c.receives)
    }

    pub fn delete_count(&self) -> usize {
        self.with_calls(|c| c.deleted.len())
    }

    pub fn visibility_change_count(&self) -> usize {
        self.with_calls(|c| c.visibility_changes.len())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt, SqsConsumerError> {
        self.calls.lock().unwrap().sent.push(message);
        if self.script.lock().unwrap().fail_sends {
            return Err(SqsConsumerError::Transport {
                operation: "send",
                message: "foobar".to_string(),
            });
        }

        Ok(SendReceipt {
            message_id: Some("message-1".to_string()),
            sequence_number: None,
        })
    }

    async fn send_batch(
        &self,
        messages: Vec<OutgoingMessage>,
    ) -> Result<BatchSendReceipt, SqsConsumerError> {
        let count = messages.len();
        self.calls.lock().unwrap().batches.push(messages);
        if self.script.lock().unwrap().fail_sends {
            return Err(SqsConsumerError::Transport {
                operation: "send_batch",
                message: "foobar".to_string(),
            });
        }

        Ok(BatchSendReceipt {
            successful: (0..count)
                .map(|i| BatchEntrySuccess {
                    id: i.to_string(),
                    message_id: format!("message-{i}"),
                })
                .collect(),
            failed: Vec::new(),
        })
    }

    async fn receive(&self, config: &ReceiveConfig) -> Result<Vec<Envelope>, SqsConsumerError> {
        tokio::task::yield_now().await;
        {
            let mut calls = self.calls.lock().unwrap();
            calls.receives += 1;
            calls.last_receive_config = Some(config.clone());
        }

        match self.script.lock().unwrap().batches.pop_front() {
            Some(Ok(envelopes)) => Ok(envelopes),
            Some(Err(message)) => Err(SqsConsumerError::Transport {
                operation: "receive",
                message,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), SqsConsumerError> {
        self.calls
            .lock()
            .unwrap()
            .deleted
            .push(receipt_handle.to_string());
        if self.script.lock().unwrap().fail_deletes {
            return Err(SqsConsumerError::Transport {
                operation: "delete",
                message: "receipt handle is invalid".to_string(),
            });
        }
        Ok(())
    }

    async fn change_visibility(
        &self,
        receipt_handle: &str,
        seconds: i32,
    ) -> Result<(), SqsConsumerError> {
        self.calls
            .lock()
            .unwrap()
            .visibility_changes
            .push((receipt_handle.to_string(), seconds));
        if self.script.lock().unwrap().fail_visibility_changes {
            return Err(SqsConsumerError::Transport {
                operation: "change_visibility",
                message: "bar".to_string(),
            });
        }
        Ok(())
    }
}

pub fn options() -> ClientOptions {
    ClientOptions::new("foo", "bar", "baz")
}

pub fn client_with(options: ClientOptions) -> (SqsClient<RecordingTransport>, RecordingTransport) {
    let transport = RecordingTransport::new();
    let client = SqsClient::with_transport(options, transport.clone()).expect("valid options");
    (client, transport)
}

pub fn envelope(body: &str, receipt_handle: &str) -> Envelope {
    Envelope::new(body, receipt_handle)
}

/// Polls `condition` until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(within, async {
        loop {
            if condition() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

/// Waits for `future` with a generous upper bound.
pub async fn bounded<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}
