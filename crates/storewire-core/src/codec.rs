#![forbid(unsafe_code)]

//! Tagged value codec for moving state snapshots across a process boundary.
//!
//! Every value is encoded as `{"type": <tag>, "value": <payload>}` where the
//! tag is one of `null`, `string`, `number`, `boolean`, `date`, `array`,
//! `object`. Arrays and objects carry encoded children. Dates are RFC 3339
//! strings with millisecond precision in UTC (`2024-01-02T03:04:05.678Z`).
//!
//! An absent value (`None`) encodes to `None` and decodes back to `None`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | [`Codec::deserialize`] | [`Codec::try_deserialize`] |
//! |---------|-------|------------------------|----------------------------|
//! | Unknown tag | Producer is newer / corrupt | subtree becomes `None` | `CodecError::UnknownTag` |
//! | Missing `type`/`value` | Not a tagged value | subtree becomes `None` | `CodecError::Malformed` |
//! | Bad date string | Corrupt payload | subtree becomes `None` | `CodecError::InvalidDate` |
//! | Nesting too deep | Hostile input | subtree becomes `None` | `CodecError::TooDeep` |
//!
//! The lenient decoder maps a `None` array element to `Value::Null` and drops
//! an object key whose value decodes to `None`, so the rest of a snapshot
//! still loads. Object key order is not preserved (objects are ordered maps).
//!
//! Cycles cannot be built out of persistent values, so encoding always
//! terminates; the depth limit only guards decoding of foreign input and
//! encoding of pathologically deep trees.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};
use tracing::trace;

use crate::value::Value;

/// Default nesting limit for encode/decode.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Errors from the tagged value codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown value tag '{0}'")]
    UnknownTag(String),
    #[error("malformed tagged value: {0}")]
    Malformed(&'static str),
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("invalid json: {0}")]
    Json(String),
}

/// Tagged value encoder/decoder with a nesting limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    max_depth: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Codec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Encode a value. `None` encodes to `None`.
    pub fn serialize(&self, value: Option<&Value>) -> Result<Option<Json>, CodecError> {
        value.map(|v| self.encode(v, 0)).transpose()
    }

    /// Decode leniently: unrecognized subtrees become `None`.
    #[must_use]
    pub fn deserialize(&self, data: Option<&Json>) -> Option<Value> {
        data.and_then(|d| self.decode(d, 0, false).ok().flatten())
    }

    /// Decode strictly: the first unrecognized subtree is an error.
    pub fn try_deserialize(&self, data: Option<&Json>) -> Result<Option<Value>, CodecError> {
        match data {
            None => Ok(None),
            Some(d) => self.decode(d, 0, true),
        }
    }

    /// Encode to a JSON string.
    pub fn to_json_string(&self, value: &Value) -> Result<String, CodecError> {
        let encoded = self.encode(value, 0)?;
        serde_json::to_string(&encoded).map_err(|e| CodecError::Json(e.to_string()))
    }

    /// Parse a JSON string and decode it leniently.
    pub fn from_json_str(&self, raw: &str) -> Result<Option<Value>, CodecError> {
        let parsed: Json = serde_json::from_str(raw).map_err(|e| CodecError::Json(e.to_string()))?;
        Ok(self.deserialize(Some(&parsed)))
    }

    fn encode(&self, value: &Value, depth: usize) -> Result<Json, CodecError> {
        if depth > self.max_depth {
            return Err(CodecError::TooDeep(self.max_depth));
        }
        let (tag, payload) = match value {
            Value::Null => ("null", Json::Null),
            Value::String(s) => ("string", Json::String(s.clone())),
            // NaN and infinities have no JSON spelling; they decode back to NaN.
            Value::Number(n) => ("number", Number::from_f64(*n).map_or(Json::Null, Json::Number)),
            Value::Bool(b) => ("boolean", Json::Bool(*b)),
            Value::Date(d) => (
                "date",
                Json::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
            Value::Array(items) => (
                "array",
                Json::Array(
                    items
                        .iter()
                        .map(|item| self.encode(item, depth + 1))
                        .collect::<Result<_, _>>()?,
                ),
            ),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map.iter() {
                    out.insert(key.clone(), self.encode(item, depth + 1)?);
                }
                ("object", Json::Object(out))
            }
        };
        let mut tagged = Map::with_capacity(2);
        tagged.insert("type".to_owned(), Json::String(tag.to_owned()));
        tagged.insert("value".to_owned(), payload);
        Ok(Json::Object(tagged))
    }

    fn decode(&self, data: &Json, depth: usize, strict: bool) -> Result<Option<Value>, CodecError> {
        let fail = |err: CodecError| {
            if strict {
                Err(err)
            } else {
                trace!(error = %err, "dropping undecodable subtree");
                Ok(None)
            }
        };

        if depth > self.max_depth {
            return fail(CodecError::TooDeep(self.max_depth));
        }
        let Some(obj) = data.as_object() else {
            return fail(CodecError::Malformed("expected an object"));
        };
        let (Some(tag), Some(payload)) = (obj.get("type"), obj.get("value")) else {
            return fail(CodecError::Malformed("missing 'type' or 'value'"));
        };
        let Some(tag) = tag.as_str() else {
            return fail(CodecError::Malformed("'type' is not a string"));
        };

        let value = match tag {
            "null" => Value::Null,
            "string" => match payload.as_str() {
                Some(s) => Value::String(s.to_owned()),
                None => return fail(CodecError::Malformed("string payload")),
            },
            "number" => match payload {
                Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
                Json::Null => Value::Number(f64::NAN),
                _ => return fail(CodecError::Malformed("number payload")),
            },
            "boolean" => match payload.as_bool() {
                Some(b) => Value::Bool(b),
                None => return fail(CodecError::Malformed("boolean payload")),
            },
            "date" => {
                let Some(raw) = payload.as_str() else {
                    return fail(CodecError::Malformed("date payload"));
                };
                match DateTime::parse_from_rfc3339(raw) {
                    Ok(d) => Value::Date(d.with_timezone(&Utc)),
                    Err(_) => return fail(CodecError::InvalidDate(raw.to_owned())),
                }
            }
            "array" => {
                let Some(items) = payload.as_array() else {
                    return fail(CodecError::Malformed("array payload"));
                };
                let mut out = im::Vector::new();
                for item in items {
                    out.push_back(self.decode(item, depth + 1, strict)?.unwrap_or(Value::Null));
                }
                Value::Array(out)
            }
            "object" => {
                let Some(entries) = payload.as_object() else {
                    return fail(CodecError::Malformed("object payload"));
                };
                let mut out = im::OrdMap::new();
                for (key, item) in entries {
                    if let Some(decoded) = self.decode(item, depth + 1, strict)? {
                        out.insert(key.clone(), decoded);
                    }
                }
                Value::Object(out)
            }
            other => return fail(CodecError::UnknownTag(other.to_owned())),
        };
        Ok(Some(value))
    }
}

/// Encode with the default codec.
pub fn serialize(value: Option<&Value>) -> Result<Option<Json>, CodecError> {
    Codec::default().serialize(value)
}

/// Decode leniently with the default codec.
#[must_use]
pub fn deserialize(data: Option<&Json>) -> Option<Value> {
    Codec::default().deserialize(data)
}

/// Decode strictly with the default codec.
pub fn try_deserialize(data: Option<&Json>) -> Result<Option<Value>, CodecError> {
    Codec::default().try_deserialize(data)
}
