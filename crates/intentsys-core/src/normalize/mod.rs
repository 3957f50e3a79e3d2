//! Response normalization: raw oracle text → typed, schema-valid record.
//!
//! A strict parse is tried first; a response that passes it produces no
//! warnings. Scores written as fractions skip the strict parse so they are
//! scaled the same way whichever path reads them. Otherwise each field is recovered on its own, defaulting
//! and coercing where it must and recording a [`Warning`] for every such
//! decision. Only a response with no recoverable payload at all fails.

pub mod extract;
pub mod fields;
mod schema;

pub use extract::extract_payload;
pub use fields::Recovery;

use crate::domain::{NormalizationError, Stage, Warning};
use crate::obs;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A stage's target record plus the recoveries applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Normalized<T> {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A record the normalizer can produce.
pub trait Schema: DeserializeOwned + Sized {
    /// Stage whose responses carry this record.
    const STAGE: Stage;

    /// Top-level keys (canonical and alias) that identify this record.
    const FIELDS: &'static [&'static str];

    /// Record-level invariants beyond what deserialization checks.
    fn check(&self) -> Result<(), String>;

    /// Field-by-field recovery. `Err` only when the payload holds nothing
    /// this record can be built from.
    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String>;
}

/// Normalize a raw oracle response into `T`.
pub fn normalize<T: Schema>(raw: &str) -> Result<Normalized<T>, NormalizationError> {
    let stage = T::STAGE;
    let payload = extract_payload(raw)
        .ok_or_else(|| NormalizationError::new(stage, "no structured payload found", raw))?;
    let payload = unwrap_envelope::<T>(payload)
        .ok_or_else(|| NormalizationError::new(stage, "payload carries none of the expected fields", raw))?;

    if !has_fractional_confidence(&payload) {
        if let Ok(value) = serde_json::from_value::<T>(Value::Object(payload.clone())) {
            if value.check().is_ok() {
                return Ok(Normalized {
                    value,
                    warnings: Vec::new(),
                });
            }
        }
    }

    let mut rec = Recovery::new(stage);
    let value = T::recover(&payload, &mut rec)
        .map_err(|reason| NormalizationError::new(stage, reason, raw))?;
    if let Err(reason) = value.check() {
        return Err(NormalizationError::new(stage, reason, raw));
    }

    let warnings = rec.into_warnings();
    for warning in &warnings {
        obs::emit_field_recovered(warning);
    }
    Ok(Normalized { value, warnings })
}

/// Accept `{"result": {...fields...}}`-style wrappers one level deep.
fn unwrap_envelope<T: Schema>(payload: Map<String, Value>) -> Option<Map<String, Value>> {
    if has_any_field::<T>(&payload) {
        return Some(payload);
    }
    payload.into_iter().find_map(|(_, value)| match value {
        Value::Object(inner) if has_any_field::<T>(&inner) => Some(inner),
        _ => None,
    })
}

// A numeric `confidence` in (0, 1] anywhere in the payload.
fn has_fractional_confidence(map: &Map<String, Value>) -> bool {
    fn walk(value: &Value) -> bool {
        match value {
            Value::Object(map) => has_fractional_confidence(map),
            Value::Array(items) => items.iter().any(walk),
            _ => false,
        }
    }
    map.iter().any(|(key, value)| match (key.as_str(), value) {
        ("confidence", Value::Number(n)) => n.as_f64().is_some_and(|c| c > 0.0 && c <= 1.0),
        _ => walk(value),
    })
}

fn has_any_field<T: Schema>(map: &Map<String, Value>) -> bool {
    T::FIELDS.iter().any(|f| map.contains_key(*f))
}
