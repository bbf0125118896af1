//! The `Value` wrapper and its conversion contract.
//!
//! A `Value` pairs a dynamic payload with its declared [`DataType`].
//! Values are never stored directly on an element; they always round
//! trip through a get/set handler.
//!
//! Conversion attempts three tiers in order: (a) direct typed
//! extraction of an already-matching payload, (b) primitive
//! widening/narrowing and string parsing per the target kind's
//! conversion table, (c) a structured re-encode/decode fallback. Only
//! when all three fail does the operation report a [`ConversionError`].

use crate::datatype::{DataObjectType, DataType, HostKind};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A dynamic payload together with its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    /// The payload in host form
    pub payload: serde_json::Value,
    /// The declared type of the payload
    pub value_type: DataType,
}

/// Value coercion exhausted all conversion tiers.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot convert {source_kind:?} value `{value_repr}` to {target}")]
pub struct ConversionError {
    /// Declared kind of the source value
    pub source_kind: DataObjectType,
    /// Name of the requested target
    pub target: String,
    /// String form of the offending payload
    pub value_repr: String,
}

impl ConversionError {
    fn new(source_kind: DataObjectType, target: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self {
            source_kind,
            target: target.into(),
            value_repr: payload.to_string(),
        }
    }
}

impl Value {
    /// Wrap a payload with its declared type.
    #[must_use]
    pub fn new(payload: serde_json::Value, value_type: DataType) -> Self {
        Self {
            payload,
            value_type,
        }
    }

    /// A string value.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::new(
            serde_json::Value::String(text.into()),
            DataType::new(DataObjectType::String),
        )
    }

    /// An integer value of the given kind.
    #[must_use]
    pub fn integer(value: i64, kind: DataObjectType) -> Self {
        Self::new(serde_json::json!(value), DataType::new(kind))
    }

    /// A double value.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::new(
            serde_json::json!(value),
            DataType::new(DataObjectType::Double),
        )
    }

    /// A boolean value.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::new(
            serde_json::Value::Bool(value),
            DataType::new(DataObjectType::Bool),
        )
    }

    /// An untyped structured value.
    #[must_use]
    pub fn json(payload: serde_json::Value) -> Self {
        Self::new(payload, DataType::new(DataObjectType::AnyType))
    }

    /// Convert to a host type.
    ///
    /// # Errors
    ///
    /// `ConversionError` when all three conversion tiers fail.
    pub fn to<T: DeserializeOwned>(&self) -> Result<T, ConversionError> {
        // Tier (a): the payload already matches the target shape
        if let Ok(value) = serde_json::from_value::<T>(self.payload.clone()) {
            return Ok(value);
        }

        // Tier (b): primitive coercion candidates
        for candidate in self.coercion_candidates() {
            if let Ok(value) = serde_json::from_value::<T>(candidate) {
                return Ok(value);
            }
        }

        // Tier (c): re-encode through text and re-materialize
        if let Ok(text) = serde_json::to_string(&self.payload) {
            if let Ok(value) = serde_json::from_str::<T>(&text) {
                return Ok(value);
            }
        }

        Err(ConversionError::new(
            self.value_type.object_type,
            std::any::type_name::<T>(),
            &self.payload,
        ))
    }

    /// Re-type this value as the target kind, coercing the payload into
    /// the target's host shape.
    ///
    /// Collection-typed values are coerced element-wise.
    ///
    /// # Errors
    ///
    /// `ConversionError` when the payload cannot be represented in the
    /// target kind.
    pub fn coerce(&self, target: DataObjectType) -> Result<Self, ConversionError> {
        let err = || ConversionError::new(self.value_type.object_type, target.xsd_name(), &self.payload);

        let payload = if self.value_type.is_collection {
            let items = self.payload.as_array().ok_or_else(err)?;
            let coerced: Option<Vec<serde_json::Value>> = items
                .iter()
                .map(|item| coerce_payload(item, target))
                .collect();
            serde_json::Value::Array(coerced.ok_or_else(err)?)
        } else {
            coerce_payload(&self.payload, target).ok_or_else(err)?
        };

        let value_type = DataType {
            object_type: target,
            is_collection: self.value_type.is_collection,
            semantic_id: None,
        };
        Ok(Self::new(payload, value_type))
    }

    /// Tier (b) candidates: the payload normalized to its declared
    /// kind, plus cross-kind scalar rewritings.
    fn coercion_candidates(&self) -> Vec<serde_json::Value> {
        let mut candidates = Vec::new();

        if let Some(normalized) = coerce_payload(&self.payload, self.value_type.object_type) {
            if normalized != self.payload {
                candidates.push(normalized);
            }
        }

        match &self.payload {
            serde_json::Value::String(text) => {
                let trimmed = text.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    candidates.push(serde_json::json!(n));
                } else if let Ok(n) = trimmed.parse::<u64>() {
                    candidates.push(serde_json::json!(n));
                }
                if let Ok(f) = trimmed.parse::<f64>() {
                    candidates.push(serde_json::json!(f));
                }
                if let Some(b) = parse_bool(trimmed) {
                    candidates.push(serde_json::Value::Bool(b));
                }
            }
            serde_json::Value::Number(n) => {
                candidates.push(serde_json::Value::String(n.to_string()));
            }
            serde_json::Value::Bool(b) => {
                candidates.push(serde_json::Value::String(b.to_string()));
                candidates.push(serde_json::json!(i64::from(*b)));
            }
            _ => {}
        }

        candidates
    }
}

/// Coerce one scalar payload into the host shape of `target`.
/// Returns `None` when the payload cannot be represented.
fn coerce_payload(payload: &serde_json::Value, target: DataObjectType) -> Option<serde_json::Value> {
    match target.host_kind() {
        HostKind::Json => Some(payload.clone()),
        HostKind::Int64 | HostKind::UInt64 => {
            let wide = wide_integer(payload)?;
            let (min, max) = target.integer_bounds()?;
            if wide < min || wide > max {
                return None;
            }
            integer_to_json(wide)
        }
        HostKind::Double => match payload {
            serde_json::Value::Number(n) => n.as_f64().map(|f| serde_json::json!(f)),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| serde_json::json!(f)),
            serde_json::Value::Bool(b) => Some(serde_json::json!(if *b { 1.0 } else { 0.0 })),
            _ => None,
        },
        HostKind::Bool => match payload {
            serde_json::Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            serde_json::Value::String(s) => parse_bool(s.trim()).map(serde_json::Value::Bool),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(0) => Some(serde_json::Value::Bool(false)),
                Some(1) => Some(serde_json::Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },
        HostKind::Utf8 => match payload {
            serde_json::Value::String(s) => Some(serde_json::Value::String(s.clone())),
            serde_json::Value::Number(n) => Some(serde_json::Value::String(n.to_string())),
            serde_json::Value::Bool(b) => Some(serde_json::Value::String(b.to_string())),
            _ => None,
        },
        HostKind::Bytes => coerce_bytes(payload, target),
        HostKind::DateTime => coerce_datetime(payload),
        HostKind::Duration => coerce_duration(payload),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn wide_integer(payload: &serde_json::Value) -> Option<i128> {
    match payload {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(i128::from(u))
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                    Some(f as i128)
                } else {
                    None
                }
            }
        }
        serde_json::Value::String(s) => s.trim().parse::<i128>().ok(),
        serde_json::Value::Bool(b) => Some(i128::from(*b)),
        _ => None,
    }
}

fn integer_to_json(wide: i128) -> Option<serde_json::Value> {
    if let Ok(i) = i64::try_from(wide) {
        Some(serde_json::json!(i))
    } else if let Ok(u) = u64::try_from(wide) {
        Some(serde_json::json!(u))
    } else {
        None
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn coerce_bytes(payload: &serde_json::Value, target: DataObjectType) -> Option<serde_json::Value> {
    match payload {
        serde_json::Value::String(s) => {
            let valid = match target {
                DataObjectType::HexBinary => {
                    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
                }
                _ => STANDARD.decode(s).is_ok(),
            };
            valid.then(|| serde_json::Value::String(s.clone()))
        }
        serde_json::Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            let bytes = bytes?;
            let text = match target {
                DataObjectType::HexBinary => {
                    bytes.iter().map(|b| format!("{b:02X}")).collect::<String>()
                }
                _ => STANDARD.encode(&bytes),
            };
            Some(serde_json::Value::String(text))
        }
        _ => None,
    }
}

fn coerce_datetime(payload: &serde_json::Value) -> Option<serde_json::Value> {
    match payload {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| serde_json::Value::String(dt.to_rfc3339())),
        serde_json::Value::Number(n) => {
            let millis = n.as_i64()?;
            let dt = Utc.timestamp_millis_opt(millis).single()?;
            Some(serde_json::Value::String(dt.to_rfc3339()))
        }
        _ => None,
    }
}

fn coerce_duration(payload: &serde_json::Value) -> Option<serde_json::Value> {
    match payload {
        serde_json::Value::String(s) => {
            let t = s.trim();
            let body = t.strip_prefix('-').unwrap_or(t);
            (body.starts_with('P') && body.len() > 1)
                .then(|| serde_json::Value::String(t.to_string()))
        }
        serde_json::Value::Number(n) => {
            let seconds = n.as_f64()?;
            Some(serde_json::Value::String(format!("PT{seconds}S")))
        }
        _ => None,
    }
}
