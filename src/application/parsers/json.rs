//! JSON object and array parsers.

use serde_json::{Map, Value};

use super::{ParserKind, ResponseParser};
use crate::domain::entities::{DEFAULT_PROTOCOL_CHARSET, RawResponse};
use crate::domain::errors::RequestError;

fn parse_value(response: &RawResponse) -> Result<Value, RequestError> {
    let text = response.text(DEFAULT_PROTOCOL_CHARSET)?;
    serde_json::from_str(&text)
        .map_err(|e| RequestError::parse_with(format!("malformed JSON: {e}"), e))
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses the body as a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonObjectParser;

impl ResponseParser for JsonObjectParser {
    type Output = Map<String, Value>;

    fn kind(&self) -> ParserKind {
        ParserKind::JsonObject
    }

    fn parse(&self, response: &RawResponse) -> Result<Self::Output, RequestError> {
        match parse_value(response)? {
            Value::Object(object) => Ok(object),
            other => Err(RequestError::parse(format!(
                "expected a JSON object, found {}",
                type_name(&other)
            ))),
        }
    }
}

/// Parses the body as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArrayParser;

impl ResponseParser for JsonArrayParser {
    type Output = Vec<Value>;

    fn kind(&self) -> ParserKind {
        ParserKind::JsonArray
    }

    fn parse(&self, response: &RawResponse) -> Result<Self::Output, RequestError> {
        match parse_value(response)? {
            Value::Array(array) => Ok(array),
            other => Err(RequestError::parse(format!(
                "expected a JSON array, found {}",
                type_name(&other)
            ))),
        }
    }
}
