//! Task definition and types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Server-assigned task identifier.
///
/// Opaque to the client. Numeric ids from the server are kept as their
/// decimal text so they round-trip into URLs unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => TaskId(text),
            RawId::Number(number) => TaskId(number.to_string()),
        })
    }
}

/// A task as returned by the service.
///
/// Only `id` is interpreted; every other field is kept verbatim in
/// `attributes` and written back out flattened next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Set an attribute
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String attribute, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn status(&self) -> Option<&str> {
        self.get_str("status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_numeric_and_string_ids() {
        let numeric: Task = serde_json::from_value(json!({ "id": 7, "title": "a" })).unwrap();
        assert_eq!(numeric.id.as_str(), "7");

        let text: Task = serde_json::from_value(json!({ "id": "abc-1" })).unwrap();
        assert_eq!(text.id, TaskId::from("abc-1"));
    }

    #[test]
    fn test_attributes_are_kept_verbatim() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "title": "Write tests",
            "status": "open",
            "tags": ["rust"],
            "points": 3
        }))
        .unwrap();

        assert_eq!(task.title(), Some("Write tests"));
        assert_eq!(task.status(), Some("open"));
        assert!(task.description().is_none());
        assert_eq!(task.get("points"), Some(&json!(3)));

        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["tags"], json!(["rust"]));
        assert_eq!(back["id"], json!("t1"));
    }

    #[test]
    fn test_builder_serializes_flat() {
        let task = Task::new("t2").with("title", "Ship").with("done", false);
        assert_eq!(task.title(), Some("Ship"));
        assert_eq!(task.get("done"), Some(&json!(false)));
        assert!(task.get_str("done").is_none());
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({ "id": "t2", "title": "Ship", "done": false })
        );
    }
}
