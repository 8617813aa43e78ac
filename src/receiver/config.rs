/// Default long-poll wait, in seconds.
pub const DEFAULT_WAIT_TIME_SECONDS: i32 = 20;

/// Caller-supplied overrides for the receive call.
///
/// Every field left as `None` falls back to the defaults in [`ReceiveConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// System attribute names to request with each message.
    pub attribute_names: Option<Vec<String>>,

    /// Custom message attribute names to request with each message.
    pub message_attribute_names: Option<Vec<String>>,

    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: Option<i32>,

    /// The maximum number of messages to receive in a single request.
    pub max_number_of_messages: Option<i32>,

    /// Visibility timeout applied to the received messages, in seconds.
    pub visibility_timeout: Option<i32>,
}

impl ReceiveOptions {
    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn message_attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_attribute_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn wait_time_seconds(mut self, value: i32) -> Self {
        self.wait_time_seconds = Some(value);
        self
    }

    pub fn max_number_of_messages(mut self, value: i32) -> Self {
        self.max_number_of_messages = Some(value);
        self
    }

    pub fn visibility_timeout(mut self, value: i32) -> Self {
        self.visibility_timeout = Some(value);
        self
    }
}

/// The frozen configuration every receive call of a poll loop is issued with.
///
/// Built once from [`ReceiveOptions`] when polling starts and never changed
/// afterwards.
///
/// # Fields
/// - `attribute_names`: system attributes to request, `["All"]` by default.
/// - `message_attribute_names`: custom attributes to request, `["All"]` by default.
/// - `wait_time_seconds`: the wait time for long polling, 20 seconds by default.
/// - `max_number_of_messages`: batch size, left to the service when `None`.
/// - `visibility_timeout`: visibility timeout on receipt, left to the queue when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveConfig {
    pub attribute_names: Vec<String>,
    pub message_attribute_names: Vec<String>,
    pub wait_time_seconds: i32,
    pub max_number_of_messages: Option<i32>,
    pub visibility_timeout: Option<i32>,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        ReceiveConfig {
            attribute_names: vec!["All".to_string()],
            message_attribute_names: vec!["All".to_string()],
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            max_number_of_messages: None,
            visibility_timeout: None,
        }
    }
}

impl ReceiveConfig {
    /// Merges caller overrides over the defaults. Caller fields win.
    pub fn from_options(options: ReceiveOptions) -> Self {
        let defaults = ReceiveConfig::default();

        ReceiveConfig {
            attribute_names: options.attribute_names.unwrap_or(defaults.attribute_names),
            message_attribute_names: options
                .message_attribute_names
                .unwrap_or(defaults.message_attribute_names),
            wait_time_seconds: options
                .wait_time_seconds
                .unwrap_or(defaults.wait_time_seconds),
            max_number_of_messages: options
                .max_number_of_messages
                .or(defaults.max_number_of_messages),
            visibility_timeout: options.visibility_timeout.or(defaults.visibility_timeout),
        }
    }
}

impl From<ReceiveOptions> for ReceiveConfig {
    fn from(options: ReceiveOptions) -> Self {
        ReceiveConfig::from_options(options)
    }
}
