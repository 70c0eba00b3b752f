use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// What a message carries. Chart specifications are kept as the raw JSON the
/// agent produced and handed to the chart renderer untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum MessageContent {
    Text(String),
    Chart(JsonValue),
}

impl MessageContent {
    /// An object carrying a `mark` or `$schema` key is a chart specification.
    pub fn is_chart_spec(value: &JsonValue) -> bool {
        value
            .as_object()
            .map(|obj| obj.contains_key("mark") || obj.contains_key("$schema"))
            .unwrap_or(false)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Chart(_) => None,
        }
    }
}

impl From<JsonValue> for MessageContent {
    fn from(value: JsonValue) -> Self {
        if Self::is_chart_spec(&value) {
            return MessageContent::Chart(value);
        }
        match value {
            JsonValue::String(text) => MessageContent::Text(text),
            other => MessageContent::Text(other.to_string()),
        }
    }
}

impl From<MessageContent> for JsonValue {
    fn from(content: MessageContent) -> Self {
        match content {
            MessageContent::Text(text) => JsonValue::String(text),
            MessageContent::Chart(spec) => spec,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    pub fn agent(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Agent, content)
    }
}
