//! Per-field readers with defaulting.
//!
//! Every reader takes a list of accepted keys (canonical first, then the
//! aliases models tend to use) and records a [`Warning`] on the
//! [`Recovery`] whenever it has to default or coerce.

use crate::domain::{Confidence, RiskLevel, Stage, Warning};
use serde_json::{Map, Value};

/// Accumulates warnings for one normalization pass.
#[derive(Debug)]
pub struct Recovery {
    stage: Stage,
    prefix: String,
    warnings: Vec<Warning>,
}

impl Recovery {
    pub fn new(stage: Stage) -> Self {
        Recovery {
            stage,
            prefix: String::new(),
            warnings: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        let path = if self.prefix.is_empty() {
            field.to_string()
        } else if field.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}.{}", self.prefix, field)
        };
        self.warnings.push(Warning::new(self.stage, path, message));
    }

    /// Run `f` with `segment` appended to every warning path.
    pub fn scoped<T>(&mut self, segment: &str, f: impl FnOnce(&mut Recovery) -> T) -> T {
        let saved = self.prefix.clone();
        self.prefix = if saved.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", saved, segment)
        };
        let out = f(self);
        self.prefix = saved;
        out
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// First non-null value under any of `keys`.
pub fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

/// Scalar as trimmed, non-empty text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Keys under which list items given as objects usually carry their text.
const ITEM_TEXT_KEYS: &[&str] = &["name", "title", "text", "description", "value", "goal", "metric"];

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => lookup(map, ITEM_TEXT_KEYS).and_then(as_text),
        other => as_text(other),
    }
}

/// Optional text field; no warning when absent.
pub fn optional_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    lookup(obj, keys).and_then(as_text)
}

/// Required text field; defaults to `default` with a warning.
pub fn text_field(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &str,
    default: &str,
    rec: &mut Recovery,
) -> String {
    match lookup(obj, keys) {
        None => {
            rec.warn(field, format!("missing; defaulted to {:?}", default));
            default.to_string()
        }
        Some(value) => match item_text(value) {
            Some(text) => text,
            None => {
                rec.warn(field, format!("not text; defaulted to {:?}", default));
                default.to_string()
            }
        },
    }
}

/// Required list of strings; defaults to empty with a warning.
///
/// A lone string becomes a one-item list; items that carry no text are
/// dropped with a warning.
pub fn text_list(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &str,
    rec: &mut Recovery,
) -> Vec<String> {
    match lookup(obj, keys) {
        None => {
            rec.warn(field, "missing; defaulted to an empty list");
            Vec::new()
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                match item_text(item) {
                    Some(text) => out.push(text),
                    None => rec.warn(&format!("{}[{}]", field, idx), "item carries no text; dropped"),
                }
            }
            out
        }
        Some(value) => match as_text(value) {
            Some(text) => {
                rec.warn(field, "expected a list; wrapped single value");
                vec![text]
            }
            None => {
                rec.warn(field, "not a list; defaulted to an empty list");
                Vec::new()
            }
        },
    }
}

/// Drop repeated entries, keeping first occurrences in order.
pub fn dedup(items: Vec<String>, field: &str, rec: &mut Recovery) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let before = items.len();
    let out: Vec<String> = items
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect();
    if out.len() < before {
        rec.warn(field, format!("removed {} duplicate entr(ies)", before - out.len()));
    }
    out
}

/// Required risk level; missing or unrecognised values become MEDIUM.
pub fn risk_field(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &str,
    rec: &mut Recovery,
) -> RiskLevel {
    let fallback = RiskLevel::default();
    match lookup(obj, keys) {
        None => {
            rec.warn(field, format!("missing; defaulted to {}", fallback));
            fallback
        }
        Some(value) => match as_text(value).as_deref().and_then(RiskLevel::parse_lenient) {
            Some(level) => level,
            None => {
                rec.warn(field, format!("unrecognised value {}; defaulted to {}", value, fallback));
                fallback
            }
        },
    }
}

/// Required confidence score.
///
/// Missing → 50. Values in `(0, 1]` without a percent sign are read as
/// fractions and scaled. Out-of-range values are clamped. Each case warns.
pub fn confidence_field(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &str,
    rec: &mut Recovery,
) -> Confidence {
    let Some(value) = lookup(obj, keys) else {
        rec.warn(field, format!("missing; defaulted to {}", Confidence::DEFAULT.value()));
        return Confidence::DEFAULT;
    };

    let (number, percent) = match value {
        Value::Number(n) => (n.as_f64(), false),
        Value::String(s) => {
            let t = s.trim();
            match t.strip_suffix('%') {
                Some(stripped) => (stripped.trim().parse::<f64>().ok(), true),
                None => (t.parse::<f64>().ok(), false),
            }
        }
        _ => (None, false),
    };

    let Some(number) = number.filter(|n| n.is_finite()) else {
        rec.warn(
            field,
            format!("not numeric ({}); defaulted to {}", value, Confidence::DEFAULT.value()),
        );
        return Confidence::DEFAULT;
    };

    if !percent && number > 0.0 && number <= 1.0 {
        rec.warn(field, format!("{} read as a fraction; scaled to {}", number, number * 100.0));
        return Confidence::clamped(number * 100.0);
    }

    match Confidence::new(number) {
        Some(c) => {
            if matches!(value, Value::String(_)) {
                rec.warn(field, "given as text; parsed as a number");
            }
            c
        }
        None => {
            let clamped = Confidence::clamped(number);
            rec.warn(field, format!("{} out of range; clamped to {}", number, clamped.value()));
            clamped
        }
    }
}
