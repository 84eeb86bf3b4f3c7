//! Inbound body decoding and outbound re-encoding

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{ProxyError, ProxyResult};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Decode an inbound body into a JSON value.
///
/// URL-encoded bodies become an object of string fields (last value wins
/// for repeated keys). JSON bodies (no content-type, `application/json`
/// or any `+json` type) are parsed and rejected when malformed. Other
/// content-types, like an empty body, yield `None`.
pub fn decode_inbound(content_type: Option<&str>, body: &Bytes) -> ProxyResult<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match InboundKind::from_content_type(content_type) {
        InboundKind::Form => {
            let fields: Map<String, Value> = url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect();
            Ok(Some(Value::Object(fields)))
        }
        InboundKind::Json => serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| ProxyError::InvalidBody(e.to_string())),
        InboundKind::Other => Ok(None),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum InboundKind {
    Json,
    Form,
    Other,
}

impl InboundKind {
    fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return Self::Json;
        };

        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.is_empty() || essence == JSON_CONTENT_TYPE || essence.ends_with("+json") {
            Self::Json
        } else if essence == FORM_CONTENT_TYPE {
            Self::Form
        } else {
            Self::Other
        }
    }
}

/// Serialize a body as URL-encoded form fields.
///
/// Only top-level object fields are sent and `null` fields are dropped.
/// Values are stringified the way browsers stringify form values: arrays
/// join their elements with `,` and objects become `[object Object]`.
pub fn encode_form(body: Option<&Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            if !value.is_null() {
                serializer.append_pair(key, &form_value(value));
            }
        }
    }
    serializer.finish()
}

fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                // 2.0 prints as "2"
                n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(form_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Interpret a downstream body for JSON relay.
///
/// Bodies that are not valid JSON are relayed as a JSON string holding
/// the raw text.
pub fn relay_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
