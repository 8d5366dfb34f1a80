use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::{Map, Value};

use crate::ResourceId;

/// Sequence number of an event, and the version of the aggregate it produces.
///
/// Numbers start at 1 for the first event of a resource and increase by 1
/// with no gaps. An aggregate with nothing applied is at version 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) for a new aggregate.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1) for the first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// An immutable fact in a resource's history.
///
/// Serialized flat: `number`, `type` and `created` sit next to the
/// type-specific payload fields, so those names (and `id`, which the
/// stored row adds) cannot be used as payload keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the resource's stream, starting at 1.
    pub number: Version,

    /// Tag selecting the state-transition handler (e.g. "DeployCreated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event was created.
    pub created: DateTime<Utc>,

    /// Type-specific fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Field names owned by the event envelope and the stored row.
    pub const RESERVED_FIELDS: [&'static str; 4] = ["id", "number", "type", "created"];

    /// Creates an event with an empty payload, stamped with the current time.
    pub fn new(number: Version, event_type: impl Into<String>) -> Self {
        Self {
            number,
            event_type: event_type.into(),
            created: Utc::now(),
            payload: Map::new(),
        }
    }

    /// Overrides the creation timestamp.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Adds a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Merges the fields of a serializable struct into the payload.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(payload)? {
            Value::Object(fields) => {
                if let Some(reserved) = Self::RESERVED_FIELDS
                    .iter()
                    .find(|name| fields.contains_key(**name))
                {
                    return Err(serde_json::Error::custom(format!(
                        "payload field `{reserved}` is reserved"
                    )));
                }
                self.payload.extend(fields);
                Ok(self)
            }
            _ => Err(serde_json::Error::custom("event payload must be a JSON object")),
        }
    }

    /// Builds an event from a `{"type": ..., ...fields}` object, the shape an
    /// internally tagged serde enum serializes to.
    pub fn from_tagged(number: Version, tagged: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut fields) = tagged else {
            return Err(serde_json::Error::custom("tagged event must be a JSON object"));
        };
        let event_type = match fields.remove("type") {
            Some(Value::String(event_type)) => event_type,
            _ => return Err(serde_json::Error::custom("tagged event is missing a string `type`")),
        };
        if let Some(reserved) = Self::RESERVED_FIELDS
            .iter()
            .find(|name| fields.contains_key(**name))
        {
            return Err(serde_json::Error::custom(format!(
                "payload field `{reserved}` is reserved"
            )));
        }

        Ok(Self {
            number,
            event_type,
            created: Utc::now(),
            payload: fields,
        })
    }

    /// Returns the `{"type": ..., ...fields}` object for this event's payload.
    pub fn to_tagged(&self) -> Value {
        let mut fields = self.payload.clone();
        fields.insert("type".to_owned(), Value::String(self.event_type.clone()));
        Value::Object(fields)
    }
}

/// One stored row: a serialized event plus the resource it belongs to.
///
/// The log is keyed by `(id, number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: ResourceId,

    #[serde(flatten)]
    pub event: Event,
}

impl EventRecord {
    pub fn new(id: ResourceId, event: Event) -> Self {
        Self { id, event }
    }

    /// The event number (sort key).
    pub fn number(&self) -> Version {
        self.event.number
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}
