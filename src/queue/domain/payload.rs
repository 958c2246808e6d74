//! Opaque structured payload carried by each task.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Arguments for a task, stored as a JSON document.
///
/// The queue never inspects the payload; handlers decode the shape they
/// expect with [`TaskPayload::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPayload(Value);

impl TaskPayload {
    /// Wraps an already-built JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Serializes any value into a payload.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised when the value cannot be
    /// represented as JSON (for example a map with non-string keys).
    pub fn from_serializable<T>(value: &T) -> serde_json::Result<Self>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value).map(Self)
    }

    /// Decodes the payload into a handler-specific type.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised when the stored document does
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.0)
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for TaskPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
