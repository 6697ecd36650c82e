//! Deterministic repair of the untrusted JSON a completion returns.
//!
//! Every repair is independent and idempotent: a field is either usable as-is
//! or replaced with a defined substitute, and repairs that lose information
//! cap the candidate's confidence. Capping only ever lowers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use taskmint_core::domain::candidate::{TaskCandidate, TASK_NAME_SENTINEL};
use taskmint_core::domain::task::{Priority, MAX_TASK_NAME_CHARS};
use taskmint_core::timezone::ReferenceZone;

use crate::extractor::ExtractionError;

const CAP_MISSING_NAME: f64 = 0.3;
const CAP_UNPARSABLE_DUE_DATE: f64 = 0.4;
const CAP_ABSENT_DUE_DATE: f64 = 0.5;
const FALLBACK_CONFIDENCE: f64 = 0.5;

pub struct NormalizeContext<'a> {
    pub fallback_assignee: &'a str,
    pub now: DateTime<Utc>,
    pub zone: ReferenceZone,
}

/// Removes a surrounding triple-backtick fence (with or without a language
/// tag) so the payload inside can be parsed as JSON.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag line, if any ("```json\n...").
    match body.split_once('\n') {
        Some((first_line, payload)) if !first_line.trim().is_empty() => payload.trim(),
        _ => body.trim(),
    }
}

/// Parses a completion into candidates, repairing each element. The response
/// must be a JSON array of objects; anything else is a hard failure. An empty
/// array is a valid result, not an error.
pub fn normalize_response(
    raw: &str,
    context: &NormalizeContext<'_>,
) -> Result<Vec<TaskCandidate>, ExtractionError> {
    let payload = strip_code_fences(raw);
    let parsed: Value = serde_json::from_str(payload)
        .map_err(|source| ExtractionError::ResponseNotJson { source })?;

    let Value::Array(elements) = parsed else {
        return Err(ExtractionError::ResponseNotArray);
    };

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| normalize_element(index, element, context))
        .collect()
}

fn normalize_element(
    index: usize,
    element: &Value,
    context: &NormalizeContext<'_>,
) -> Result<TaskCandidate, ExtractionError> {
    let Value::Object(fields) = element else {
        return Err(ExtractionError::ElementNotObject { index });
    };

    // Base confidence is resolved first so later caps apply to a known-good
    // value.
    let mut confidence = fields
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|value| (0.0..=1.0).contains(value))
        .unwrap_or(FALLBACK_CONFIDENCE);

    let task_name = match non_empty_string(fields.get("taskName")) {
        Some(name) => clip_chars(name, MAX_TASK_NAME_CHARS),
        None => {
            confidence = confidence.min(CAP_MISSING_NAME);
            TASK_NAME_SENTINEL.to_string()
        }
    };

    let assignee = non_empty_string(fields.get("assignee"))
        .unwrap_or(context.fallback_assignee)
        .to_string();

    let priority = non_empty_string(fields.get("priority"))
        .and_then(|value| value.parse::<Priority>().ok())
        .unwrap_or_default();

    // A due date that is present but not a parsable string (a JSON number,
    // bool, object, ...) counts as unparsable, not absent.
    let due_date = match fields.get("dueDate") {
        None | Some(Value::Null) => {
            confidence = confidence.min(CAP_ABSENT_DUE_DATE);
            context.zone.end_of_day(context.now)
        }
        Some(value) => {
            match value.as_str().and_then(|raw| parse_due_date(raw, &context.zone)) {
                Some(parsed) => parsed,
                None => {
                    confidence = confidence.min(CAP_UNPARSABLE_DUE_DATE);
                    context.zone.end_of_day(context.now)
                }
            }
        }
    };

    Ok(TaskCandidate { task_name, assignee, due_date, priority, confidence })
}

fn non_empty_string(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|text| !text.is_empty())
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// RFC 3339 first; naive datetime and date-only forms are interpreted in the
/// reference zone (date-only means end of that day).
fn parse_due_date(raw: &str, zone: &ReferenceZone) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return zone.resolve_local(naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let end_of_day = date.and_hms_milli_opt(23, 59, 59, 999)?;
        return zone.resolve_local(end_of_day);
    }

    None
}
