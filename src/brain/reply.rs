//! Mapping of free-form model replies onto `Classification` / `BugReport`.
//!
//! Models wrap JSON in prose or code fences, use arrays or objects for
//! coordinates, and drop optional keys. Optional fields default to
//! empty/false; `screen_type` and `action` are required, and a tap must
//! come with coordinates.

use serde_json::{Map, Value};
use tracing::debug;

use super::types::{
    Blocker, BrainError, BrainResult, BugDetails, BugReport, Classification, Point,
    SuggestedAction,
};

/// Pull the first JSON object out of a model reply.
///
/// Parsing stops at the end of that object, so trailing prose (even prose
/// containing braces) is ignored.
pub fn extract_json_object(text: &str) -> BrainResult<Map<String, Value>> {
    let start = text
        .find('{')
        .ok_or_else(|| BrainError::Malformed("no JSON object in reply".to_string()))?;

    let first = serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| BrainError::Malformed("unterminated JSON object".to_string()))?;

    match first {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(BrainError::Malformed(format!("expected an object, got {}", other))),
        Err(e) => Err(BrainError::Malformed(e.to_string())),
    }
}

/// Map a classification reply
pub fn parse_classification(text: &str) -> BrainResult<Classification> {
    let obj = extract_json_object(text)?;

    let screen_type = string_field(&obj, &["screen_type", "screenType"])
        .ok_or(BrainError::MissingField("screen_type"))?;
    let verb = string_field(&obj, &["action", "suggested_action", "suggestedAction"])
        .ok_or(BrainError::MissingField("action"))?;
    let coords = field(&obj, &["coords", "coordinates"]).and_then(parse_point);

    let action = match verb.to_lowercase().as_str() {
        "tap" | "click" | "press" => match coords {
            Some(point) => SuggestedAction::Tap(point),
            None => {
                return Err(BrainError::Malformed(
                    "tap suggested without coordinates".to_string(),
                ))
            }
        },
        "wait" => SuggestedAction::Wait,
        "none" | "" => SuggestedAction::None,
        _ => SuggestedAction::Other { verb },
    };

    let blocking_elements = field(&obj, &["blocking_elements", "blockingElements"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_blocker).collect())
        .unwrap_or_default();

    let rationale = string_field(&obj, &["reasoning", "rationale"]).unwrap_or_default();

    let is_bug = bool_field(&obj, &["is_bug", "isBug"]);
    let bug = if is_bug {
        let details = field(&obj, &["bug_details", "bugDetails"]).and_then(Value::as_object);
        Some(BugDetails {
            kind: details
                .and_then(|d| string_field(d, &["type", "bug_type"]))
                .unwrap_or_else(|| "unspecified".to_string()),
            severity: details
                .and_then(|d| string_field(d, &["severity"]))
                .unwrap_or_else(|| "unknown".to_string()),
            description: details
                .and_then(|d| string_field(d, &["description"]))
                .unwrap_or_else(|| rationale.clone()),
        })
    } else {
        None
    };

    Ok(Classification {
        screen_type,
        action,
        target: string_field(&obj, &["target"]),
        blocking_elements,
        bug,
        rationale,
    })
}

/// Map a bug-check reply
pub fn parse_bug_report(text: &str) -> BrainResult<BugReport> {
    let obj = extract_json_object(text)?;

    const HAS_BUG: &[&str] = &["has_bug", "is_bug", "hasBug"];
    if field(&obj, HAS_BUG).is_none() {
        return Err(BrainError::MissingField("has_bug"));
    }
    let has_bug = bool_field(&obj, HAS_BUG);

    if !has_bug {
        return Ok(BugReport::none());
    }

    Ok(BugReport {
        has_bug,
        bug_type: string_field(&obj, &["bug_type", "type"]),
        severity: string_field(&obj, &["severity"]),
        description: string_field(&obj, &["description"]),
    })
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name))
        .filter(|v| !v.is_null())
}

fn string_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match field(obj, names)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bool_field(obj: &Map<String, Value>, names: &[&str]) -> bool {
    match field(obj, names) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Accepts `[x, y]` or `{"x": .., "y": ..}`; fractional values are rounded
fn parse_point(value: &Value) -> Option<Point> {
    let (x, y) = match value {
        Value::Array(items) if items.len() >= 2 => (&items[0], &items[1]),
        Value::Object(map) => (map.get("x")?, map.get("y")?),
        _ => return None,
    };
    Some(Point::new(x.as_f64()?.round() as i32, y.as_f64()?.round() as i32))
}

fn parse_blocker(value: &Value) -> Option<Blocker> {
    let obj = value.as_object()?;
    let at = field(obj, &["coords", "coordinates"]).and_then(parse_point);
    let kind = string_field(obj, &["type", "kind"]).unwrap_or_else(|| "overlay".to_string());
    match at {
        Some(at) => Some(Blocker { kind, at }),
        None => {
            debug!(%kind, "dropping blocker without coordinates");
            None
        }
    }
}
