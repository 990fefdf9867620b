// Response envelope shared by every backend endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ success, message, data, errors, meta }` wrapper.
///
/// Every field is defaulted so a partially-populated body still parses;
/// callers check `success` themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: T,
    #[serde(default)]
    pub errors: Value,
    #[serde(default)]
    pub meta: Value,
}

impl<T: Default> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            success: false,
            message: None,
            data: T::default(),
            errors: Value::Null,
            meta: Value::Null,
        }
    }
}

impl<T> Envelope<T> {
    /// Replace the payload, keeping the top-level metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            message: self.message,
            data: f(self.data),
            errors: self.errors,
            meta: self.meta,
        }
    }
}

/// `{ items: [...] }` payload used by listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}
