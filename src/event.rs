use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source::SourceError;

/// Reserved kind used when a receive failure is reported through dispatch.
pub const ERROR_KIND: &str = "error";

/// A discriminated event record: a `kind` selecting the subscriber set and
/// a field/value payload.
///
/// Events are produced by an [`EventSource`](crate::source::EventSource),
/// consumed exactly once by the pump, fanned out to the handlers currently
/// registered for their kind, and then discarded. They are never persisted
/// by this crate, but serialize cleanly for callers that want to.
///
/// # Example
///
/// ```
/// use fanbridge::event::Event;
///
/// let event = Event::new("tick").with("count", 3);
/// assert_eq!(event.kind(), "tick");
/// assert_eq!(event.u64_field("count"), Some(3));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    kind: String,
    payload: FxHashMap<String, Value>,
    at: DateTime<Utc>,
}

impl Event {
    /// Create an event of the given kind with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: FxHashMap::default(),
            at: Utc::now(),
        }
    }

    /// Attach a payload field, consuming and returning the event.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(field.into(), value.into());
        self
    }

    /// Build the reserved failure event for a failed receive.
    pub(crate) fn receive_failure(kind: impl Into<String>, error: &SourceError) -> Self {
        Self::new(kind).with("message", error.to_string())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &FxHashMap<String, Value> {
        &self.payload
    }

    /// Timestamp taken when the event was constructed.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Look up a payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Look up a payload field and coerce it to `u64`.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(Value::as_u64)
    }

    /// Look up a payload field and coerce it to `&str`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Convert the event to a JSON value with a normalized schema.
    ///
    /// ```json
    /// {
    ///   "kind": "tick",
    ///   "payload": { "count": 3 },
    ///   "at": "2025-11-03T12:34:56.789Z"
    /// }
    /// ```
    ///
    /// # Example
    ///
    /// ```
    /// use fanbridge::event::Event;
    ///
    /// let json = Event::new("tick").with("count", 3).to_json_value();
    /// assert_eq!(json["kind"], "tick");
    /// assert_eq!(json["payload"]["count"], 3);
    /// ```
    pub fn to_json_value(&self) -> Value {
        use serde_json::json;

        let mut payload = serde_json::Map::new();
        let mut fields: Vec<_> = self.payload.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, value) in fields {
            payload.insert(field.clone(), value.clone());
        }

        json!({
            "kind": self.kind,
            "payload": Value::Object(payload),
            "at": self.at.to_rfc3339(),
        })
    }

    /// Convert the event to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        let mut fields: Vec<_> = self.payload.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, value) in fields {
            write!(f, " {field}={value}")?;
        }
        Ok(())
    }
}
