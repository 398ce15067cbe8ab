use serde_json::Value;

/// Record is a wrapper around serde_json::Value
/// It represents a JSON object (one row of data)
#[derive(Clone, Debug)]
pub struct Record(pub Value);

impl Record {
    /// Create a new empty JSON object
    pub fn new() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// Create from a JSON Value, rejecting anything that is not an object
    pub fn from_value(value: Value) -> Option<Self> {
        if value.is_object() {
            Some(Record(value))
        } else {
            None
        }
    }

    /// Get a reference to the inner Value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    // --- getters ---
    pub fn get(&self, k: &str) -> Option<&Value> {
        self.0.get(k)
    }

    pub fn get_str(&self, k: &str) -> Option<&str> {
        self.0.get(k)?.as_str()
    }

    pub fn get_i64(&self, k: &str) -> Option<i64> {
        self.0.get(k)?.as_i64()
    }

    // --- setters ---
    pub fn set_str(&mut self, k: impl Into<String>, v: impl Into<String>) {
        if let Value::Object(ref mut map) = self.0 {
            map.insert(k.into(), Value::String(v.into()));
        }
    }

    pub fn set_i64(&mut self, k: impl Into<String>, v: i64) {
        if let Value::Object(ref mut map) = self.0 {
            map.insert(k.into(), Value::Number(v.into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(Record::from_value(json!({"a": 1})).is_some());
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("text")).is_none());
    }

    #[test]
    fn getters_and_setters() {
        let mut r = Record::new();
        r.set_str("name", "alpha");
        r.set_i64("count", 7);
        assert_eq!(r.get_str("name"), Some("alpha"));
        assert_eq!(r.get_i64("count"), Some(7));
        assert!(r.get("missing").is_none());
    }
}
