//! Tagged record payloads and per-record emission results.
//!
//! A transformer operation declares how each of its results should be
//! serialized by tagging it, instead of the serializer inspecting the value
//! at runtime: [`Payload::Text`] is written verbatim, [`Payload::Json`] is
//! JSON-encoded. [`Emit`] wraps zero, one, or many payloads per input record.

use serde_json::Value;

/// One unit of transformer output, tagged with its serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Written verbatim, followed by a newline.
    Text(String),
    /// JSON-encoded, followed by a newline.
    Json(Value),
}

impl Payload {
    /// Render under the generic policy: text verbatim, JSON encoded.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Text(s) => Ok(s.clone()),
            Payload::Json(v) => serde_json::to_string(v),
        }
    }

    /// Render under the JSON-lines policy: everything JSON-encoded, so a
    /// text payload becomes a quoted JSON string rather than a raw line.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Text(s) => serde_json::to_string(s),
            Payload::Json(v) => serde_json::to_string(v),
        }
    }

    /// Convert into a plain JSON value (`Text` becomes a JSON string).
    pub fn into_value(self) -> Value {
        match self {
            Payload::Text(s) => Value::String(s),
            Payload::Json(v) => v,
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

/// The result of applying an operation to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    /// Write nothing for this record.
    Nothing,
    /// One payload, one output line.
    One(Payload),
    /// A sequence of payloads. Under `multi_value` each element becomes its
    /// own output line; otherwise the sequence is serialized as a single
    /// JSON array line.
    Many(Vec<Payload>),
}

impl Emit {
    /// A verbatim text line.
    pub fn text(s: impl Into<String>) -> Self {
        Emit::One(Payload::Text(s.into()))
    }

    /// A JSON-encoded line.
    pub fn json(v: impl Into<Value>) -> Self {
        Emit::One(Payload::Json(v.into()))
    }

    /// Whether this emission writes nothing.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Emit::Nothing)
    }
}

impl From<Payload> for Emit {
    fn from(p: Payload) -> Self {
        Emit::One(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_renders_verbatim() {
        let p = Payload::Text("a,b\tc".to_string());
        assert_eq!(p.render().unwrap(), "a,b\tc");
    }

    #[test]
    fn json_renders_encoded() {
        let p = Payload::Json(json!({"y": 1}));
        assert_eq!(p.render().unwrap(), r#"{"y":1}"#);
    }

    #[test]
    fn json_lines_policy_quotes_text() {
        let p = Payload::Text("x".to_string());
        assert_eq!(p.render_json().unwrap(), r#""x""#);
    }
}
