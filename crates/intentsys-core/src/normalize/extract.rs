//! Payload extraction from raw oracle text.
//!
//! Heuristics, in order:
//! 1. bodies of fenced code blocks, then the whole text
//! 2. within each candidate, every balanced top-level `{...}` span (braces
//!    inside string literals ignored), first to parse wins
//! 3. a span that fails to parse is retried once with trailing commas removed,
//!    then searched for nested spans; an unclosed `{` is skipped as prose
//! 4. text that is itself a JSON string literal is unwrapped once

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
    })
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"))
}

/// Find the structured payload embedded in `raw`, if any.
pub fn extract_payload(raw: &str) -> Option<Map<String, Value>> {
    extract_inner(raw, true)
}

fn extract_inner(raw: &str, allow_unquote: bool) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if allow_unquote {
        if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(trimmed) {
            return extract_inner(&inner, false);
        }
    }

    let mut candidates: Vec<&str> = fence_regex()
        .captures_iter(trimmed)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    candidates.push(trimmed);

    candidates
        .into_iter()
        .flat_map(object_spans)
        .find_map(parse_span)
}

/// Balanced top-level `{...}` spans of `text`, in order of appearance.
///
/// An opening brace that is never closed is treated as prose and the scan
/// resumes just after it.
pub fn object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(unclosed) = scan_spans(rest, &mut spans) {
        rest = &rest[unclosed + 1..];
    }
    spans
}

// Pushes closed spans; returns the start of a span left open at the end.
fn scan_spans<'a>(text: &'a str, spans: &mut Vec<&'a str>) -> Option<usize> {
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=idx]);
                }
            }
            _ => {}
        }
    }
    (depth > 0).then_some(start)
}

// A span that does not parse may still wrap the payload, as in
// `{note: {...}}`, so its interior is searched too.
fn parse_span(span: &str) -> Option<Map<String, Value>> {
    parse_object(span).or_else(|| {
        object_spans(&span[1..span.len() - 1])
            .into_iter()
            .find_map(parse_span)
    })
}

fn parse_object(span: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span) {
        return Some(map);
    }
    let repaired = trailing_comma_regex().replace_all(span, "$1");
    if repaired != span {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&repaired) {
            return Some(map);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_is_returned_as_is() {
        let map = extract_payload(r#"{"goals": ["a"]}"#).unwrap();
        assert_eq!(map["goals"][0], "a");
    }

    #[test]
    fn prose_and_fences_are_stripped() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"goals\": [\"upload\"]}\n```\nLet me know if you need more.";
        let map = extract_payload(raw).unwrap();
        assert_eq!(map["goals"][0], "upload");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = r#"Result: {"note": "use {curly} braces", "goals": ["x"]} (end)"#;
        let map = extract_payload(raw).unwrap();
        assert_eq!(map["note"], "use {curly} braces");
    }

    #[test]
    fn unparseable_spans_are_skipped() {
        let raw = r#"Template {placeholder} then {"goals": ["y"]}"#;
        let map = extract_payload(raw).unwrap();
        assert_eq!(map["goals"][0], "y");
    }

    #[test]
    fn unclosed_brace_in_prose_is_skipped() {
        let raw = r#"Output uses the {schema you gave. Here it is: {"goals": ["upload"]} done"#;
        assert_eq!(object_spans(raw), vec![r#"{"goals": ["upload"]}"#]);
        assert_eq!(extract_payload(raw).unwrap()["goals"][0], "upload");
    }

    #[test]
    fn payload_wrapped_in_prose_braces_is_found() {
        let raw = r#"{note: here is the result {"goals": ["nested"]} as requested}"#;
        assert_eq!(extract_payload(raw).unwrap()["goals"][0], "nested");
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let raw = r#"{"goals": ["a", "b",], "actors": [],}"#;
        let map = extract_payload(raw).unwrap();
        assert_eq!(map["goals"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn double_encoded_payload_is_unwrapped() {
        let raw = r#""{\"goals\": [\"z\"]}""#;
        let map = extract_payload(raw).unwrap();
        assert_eq!(map["goals"][0], "z");
    }

    #[test]
    fn text_without_payload_yields_none() {
        assert!(extract_payload("I cannot help with that request.").is_none());
        assert!(extract_payload("").is_none());
        assert!(extract_payload("[1, 2, 3]").is_none());
        assert!(extract_payload("{\"goals\": [\"truncated\"").is_none());
    }
}
