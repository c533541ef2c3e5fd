use crate::error::{AgentlogError, AgentlogResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator value that opens a session.
pub const SESSION_STARTED: &str = "session_started";
/// Discriminator value that closes a session.
pub const SESSION_ENDED: &str = "session_ended";

/// Field holding the event discriminator.
pub const FIELD_EVENT: &str = "event";
/// Field holding the producing run's session id.
pub const FIELD_SESSION_ID: &str = "session_id";
/// Free-form task description declared by the producer.
pub const FIELD_TASK: &str = "task";
/// Task name the session's task id is derived from.
pub const FIELD_TASK_NAME: &str = "task_name";
/// Minted task identifier, e.g. `CHECKOUT-FLOW-2`.
pub const FIELD_TASK_ID: &str = "task_id";

/// One structured record emitted by an agent run.
///
/// Events are open-ended: every field the producer sends is kept verbatim,
/// only `event` and `session_id` carry meaning for the journal itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Creates an event with the given discriminator and no other fields.
    pub fn new(kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_EVENT.to_string(), Value::String(kind.into()));
        Self(fields)
    }

    /// Converts a decoded JSON value into an event.
    ///
    /// Only JSON objects are events; anything else is rejected.
    pub fn from_value(value: Value) -> AgentlogResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AgentlogError::InvalidEvent(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// The `event` discriminator, if present and a string.
    pub fn kind(&self) -> Option<&str> {
        self.get_str(FIELD_EVENT)
    }

    /// Whether the discriminator equals `kind`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind() == Some(kind)
    }

    /// The producing run's session id, if present and a string.
    pub fn session_id(&self) -> Option<&str> {
        self.get_str(FIELD_SESSION_ID)
    }

    /// Raw access to any field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String access to any field; non-string values yield `None`.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Whether the event carries `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Event {
    type Error = AgentlogError;

    fn try_from(value: Value) -> AgentlogResult<Self> {
        Self::from_value(value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
