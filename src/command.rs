//! Commands, arguments, results, and the identifiers that tie them together.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{CommandError, ErrorKind};
use crate::value::{self, NativeValue, NullPolicy};

/// Maximum accepted length for a client-supplied correlation id.
pub const MAX_CORRELATION_ID_LENGTH: usize = 128;

// ── Identifiers ─────────────────────────────────────────────────

/// Identifies a client session. The empty id is the implicit default session
/// used when the transport does not supply one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn default_session() -> Self {
        Self(String::new())
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Token linking a submitted command to its eventual result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationIdError {
    #[error("correlation id exceeds {MAX_CORRELATION_ID_LENGTH} characters")]
    TooLong,
    #[error("correlation id contains whitespace or control characters")]
    ContainsWhitespace,
    #[error("correlation id must be ASCII")]
    NonAscii,
}

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Sanitise a client-supplied id. Blank input yields an empty id, which
    /// the bridge replaces with a generated one.
    pub fn parse(raw: &str) -> Result<Self, CorrelationIdError> {
        let trimmed = raw.trim();
        if trimmed.len() > MAX_CORRELATION_ID_LENGTH {
            return Err(CorrelationIdError::TooLong);
        }
        if !trimmed.is_ascii() {
            return Err(CorrelationIdError::NonAscii);
        }
        if trimmed
            .chars()
            .any(|c| c.is_ascii_whitespace() || c.is_ascii_control())
        {
            return Err(CorrelationIdError::ContainsWhitespace);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CorrelationIdError> for CommandError {
    fn from(e: CorrelationIdError) -> Self {
        CommandError::invalid_argument(e.to_string())
    }
}

// ── Arguments ───────────────────────────────────────────────────

/// Named arguments of a command, already coerced to native values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(IndexMap<String, NativeValue>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from a wire payload, one field at a time. Fields whose
    /// declared schema requests an aggregate are converted deeply; all other
    /// fields get the shallow scalar coercion.
    pub fn from_wire(
        raw: &serde_json::Map<String, Value>,
        input_shape: Option<&Value>,
        policy: NullPolicy,
    ) -> Self {
        let properties = input_shape
            .and_then(|shape| shape.get("properties"))
            .and_then(Value::as_object);
        raw.iter()
            .map(|(name, wire)| {
                let structured = properties
                    .and_then(|props| props.get(name))
                    .is_some_and(value::wants_aggregate);
                let native = if structured {
                    value::to_native_deep(wire, policy)
                } else {
                    value::to_native_with(wire, policy)
                };
                (name.clone(), native)
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<NativeValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NativeValue)> {
        self.0.iter()
    }

    pub fn to_wire(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), value::to_wire(v)))
                .collect(),
        )
    }

    /// Deserialize into a typed parameter struct. Type mismatches become
    /// `InvalidArgument`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        serde_json::from_value(self.to_wire())
            .map_err(|e| CommandError::invalid_argument(format!("Invalid arguments: {e}")))
    }
}

impl<K: Into<String>, V: Into<NativeValue>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ── Command / CommandResult ─────────────────────────────────────

/// A single call, consumed exactly once by a handler on the host thread.
#[derive(Debug, Clone)]
pub struct Command {
    pub command_type: String,
    pub session_id: SessionId,
    pub correlation_id: CorrelationId,
    pub arguments: Arguments,
}

impl Command {
    pub fn new(command_type: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            command_type: command_type.into(),
            session_id: SessionId::default_session(),
            correlation_id: CorrelationId::default(),
            arguments,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Outcome of one command, produced exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub correlation_id: CorrelationId,
    pub outcome: Result<NativeValue, CommandError>,
}

impl CommandResult {
    pub fn success(correlation_id: CorrelationId, payload: NativeValue) -> Self {
        Self {
            correlation_id,
            outcome: Ok(payload),
        }
    }

    pub fn failure(correlation_id: CorrelationId, error: CommandError) -> Self {
        Self {
            correlation_id,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.outcome.as_ref().err().map(|e| e.kind)
    }

    pub fn payload(&self) -> Option<&NativeValue> {
        self.outcome.as_ref().ok()
    }
}
