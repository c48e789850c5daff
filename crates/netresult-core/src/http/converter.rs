//! Body converters
//!
//! A converter factory translates between wire bytes and a `serde_json::Value`
//! tree; typed bodies are then produced with serde. Factories are consulted in
//! registration order and the first one that accepts a content type (or can
//! encode a value) handles it.

use std::fmt;

use serde_json::Value;

use crate::{Error, Result};

/// Plugin that (de)serializes request and response bodies
pub trait ConverterFactory: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and errors
    fn name(&self) -> &'static str;

    /// Whether this factory can decode a body with the given content type
    fn accepts(&self, content_type: Option<&str>) -> bool;

    fn decode(&self, body: &[u8]) -> Result<Value>;

    /// Whether this factory can encode `value` as a request body
    fn can_encode(&self, value: &Value) -> bool;

    /// Encode `value`, returning the bytes and their content type
    fn encode(&self, value: &Value) -> Result<(Vec<u8>, &'static str)>;
}

/// JSON bodies; also used when the server sends no content type
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl ConverterFactory for JsonConverter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, content_type: Option<&str>) -> bool {
        match content_type {
            None => true,
            Some(ct) => {
                let ct = media_type(ct);
                ct == "application/json" || ct.ends_with("+json")
            }
        }
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        serde_json::from_slice(body).map_err(|e| conversion_error(self.name(), "decode", e))
    }

    fn can_encode(&self, _value: &Value) -> bool {
        true
    }

    fn encode(&self, value: &Value) -> Result<(Vec<u8>, &'static str)> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| conversion_error(self.name(), "encode", e))?;
        Ok((bytes, "application/json"))
    }
}

/// Plain-text bodies holding a single string, number or boolean
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarsConverter;

impl ConverterFactory for ScalarsConverter {
    fn name(&self) -> &'static str {
        "scalars"
    }

    fn accepts(&self, content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| media_type(ct).starts_with("text/"))
    }

    fn decode(&self, body: &[u8]) -> Result<Value> {
        let text =
            std::str::from_utf8(body).map_err(|e| conversion_error(self.name(), "decode", e))?;
        Ok(Value::String(text.to_string()))
    }

    fn can_encode(&self, value: &Value) -> bool {
        matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
    }

    fn encode(&self, value: &Value) -> Result<(Vec<u8>, &'static str)> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(Error::Conversion {
                    converter: self.name().to_string(),
                    message: format!("Cannot encode {} as plain text", kind_of(other)),
                    source: None,
                })
            }
        };
        Ok((text.into_bytes(), "text/plain; charset=utf-8"))
    }
}

/// Media type without parameters, lowercased
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn conversion_error<E>(converter: &str, direction: &str, error: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Conversion {
        converter: converter.to_string(),
        message: format!("Failed to {} body: {}", direction, error),
        source: Some(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_accepts() {
        let json = JsonConverter;
        assert!(json.accepts(None));
        assert!(json.accepts(Some("application/json")));
        assert!(json.accepts(Some("Application/JSON; charset=utf-8")));
        assert!(json.accepts(Some("application/problem+json")));
        assert!(!json.accepts(Some("text/plain")));
    }

    #[test]
    fn test_json_decode_error() {
        let err = JsonConverter.decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Conversion { ref converter, .. } if converter == "json"));
    }

    #[test]
    fn test_scalars_round_trip() {
        let scalars = ScalarsConverter;
        assert!(scalars.accepts(Some("text/plain; charset=utf-8")));
        assert!(!scalars.accepts(None));
        assert_eq!(scalars.decode(b"pong").unwrap(), json!("pong"));

        let (bytes, content_type) = scalars.encode(&json!(42)).unwrap();
        assert_eq!(bytes, b"42");
        assert_eq!(content_type, "text/plain; charset=utf-8");
    }

    #[test]
    fn test_scalars_rejects_objects() {
        let scalars = ScalarsConverter;
        let value = json!({"a": 1});
        assert!(!scalars.can_encode(&value));
        let err = scalars.encode(&value).unwrap_err();
        assert!(err.to_string().contains("an object"));
    }
}
