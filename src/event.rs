//! Event value type.
//!
//! An [`Event`] is an immutable typed occurrence with an opaque key/value
//! payload. Producers build one and hand it to the engine with `push`; from
//! then on it is shared read-only with every handler behind an `Arc`.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque event payload.
pub type EventData = Map<String, Value>;

/// Discrete event type identifier used as the registry key.
///
/// Backed by `Arc<str>` so cloning a type for every dispatch is a refcount bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Arc<str>);

impl EventType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&EventType> for EventType {
    fn from(event_type: &EventType) -> Self {
        event_type.clone()
    }
}

impl Borrow<str> for EventType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A typed occurrence passed through the engine.
///
/// `id` and `created_at` are diagnostic metadata only; dispatch looks at
/// nothing but `event_type`.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: EventType,
    data: EventData,
    id: Uuid,
    created_at: DateTime<Utc>,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self::with_data(event_type, EventData::new())
    }

    /// Create an event carrying `data`.
    pub fn with_data(event_type: impl Into<EventType>, data: EventData) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// Create an event from a JSON value.
    ///
    /// Objects become the payload as-is, `null` becomes an empty payload, and
    /// any other value is stored under the `"value"` key.
    pub fn from_json(event_type: impl Into<EventType>, value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            Value::Null => EventData::new(),
            other => {
                let mut map = EventData::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self::with_data(event_type, data)
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Look up a single payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event(type={}, data={})",
            self.event_type,
            Value::Object(self.data.clone())
        )
    }
}
