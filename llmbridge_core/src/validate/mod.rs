//! Argument validation against an input structure's field table.
//!
//! Runs before a method is invoked: applies defaults, coerces loosely typed
//! values the way models tend to send them (`"5"` for an integer, `"true"`
//! for a boolean) and collects *every* failing field, so the model can fix
//! all of them in one retry.

use serde_json::{Map, Number, Value};

use crate::error::FieldIssue;
use crate::schema::{FieldKind, FieldSpec, join_path};

/// Validates `params` against `fields` and returns the coerced argument
/// object.
///
/// `null` is accepted as "no arguments".
pub fn validate_arguments(fields: &[FieldSpec], params: &Value) -> Result<Value, Vec<FieldIssue>> {
    let empty = Map::new();
    let object = match params {
        Value::Object(object) => object,
        Value::Null => &empty,
        other => {
            return Err(vec![FieldIssue::new(
                "",
                format!("expected a JSON object of arguments, got {}", json_type_name(other)),
            )]);
        }
    };

    let mut issues = Vec::new();
    let coerced = validate_object(fields, object, "", &mut issues);
    if issues.is_empty() {
        Ok(Value::Object(coerced))
    } else {
        Err(issues)
    }
}

fn validate_object(
    fields: &[FieldSpec],
    object: &Map<String, Value>,
    prefix: &str,
    issues: &mut Vec<FieldIssue>,
) -> Map<String, Value> {
    let mut out = Map::new();

    for field in fields {
        let path = join_path(prefix, field.name);
        let supplied = std::iter::once(field.name)
            .chain(field.aliases.iter().copied())
            .find_map(|key| object.get(key).filter(|value| !value.is_null()));
        match supplied {
            None if field.required => {
                issues.push(FieldIssue::new(path, "field required"));
            }
            None => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                }
            }
            Some(value) => {
                if let Some(value) = coerce(&field.kind, value, &path, issues) {
                    out.insert(field.name.to_string(), value);
                }
            }
        }
    }

    // Unknown keys are passed through untouched; deserialization decides
    // whether the input type tolerates them.
    for (key, value) in object {
        let known = fields
            .iter()
            .any(|field| field.name == key || field.aliases.contains(&key.as_str()));
        if !known {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}

fn coerce(kind: &FieldKind, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Option<Value> {
    let coerced = match kind {
        FieldKind::String => value.as_str().map(|s| Value::String(s.to_string())),
        FieldKind::Integer => coerce_integer(value),
        FieldKind::Number => coerce_number(value),
        FieldKind::Boolean => coerce_bool(value),
        FieldKind::Enum(choices) => {
            let Some(raw) = value.as_str() else {
                issues.push(mismatch(path, kind, value));
                return None;
            };
            return match choices
                .iter()
                .find(|choice| **choice == raw)
                .or_else(|| choices.iter().find(|choice| choice.eq_ignore_ascii_case(raw)))
            {
                Some(choice) => Some(Value::String((*choice).to_string())),
                None => {
                    issues.push(FieldIssue::new(
                        path,
                        format!("'{raw}' is not one of: {}", choices.join(", ")),
                    ));
                    None
                }
            };
        }
        FieldKind::Array(items) => {
            let Some(values) = value.as_array() else {
                issues.push(mismatch(path, kind, value));
                return None;
            };
            let before = issues.len();
            let coerced: Vec<Value> = values
                .iter()
                .enumerate()
                .filter_map(|(index, item)| coerce(items, item, &format!("{path}[{index}]"), issues))
                .collect();
            return (issues.len() == before).then_some(Value::Array(coerced));
        }
        FieldKind::Object(fields) => {
            let Some(object) = value.as_object() else {
                issues.push(mismatch(path, kind, value));
                return None;
            };
            return Some(Value::Object(validate_object(fields(), object, path, issues)));
        }
        FieldKind::Unsupported(_) => Some(value.clone()),
    };

    if coerced.is_none() {
        issues.push(mismatch(path, kind, value));
    }
    coerced
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<u64>().map(Value::from))
                .ok()
        }
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn mismatch(path: &str, kind: &FieldKind, value: &Value) -> FieldIssue {
    FieldIssue::new(
        path,
        format!(
            "expected {}, got {}",
            kind.json_type().unwrap_or("a supported value"),
            json_type_name(value)
        ),
    )
}

/// JSON type of a value, as used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use serde_json::json;

    fn window_fields() -> &'static [FieldSpec] {
        static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
            vec![
                FieldSpec::required("from", "", FieldKind::String),
                FieldSpec::optional("days", "", FieldKind::Integer, json!(7)),
            ]
        });
        FIELDS.as_slice()
    }

    fn search_fields() -> &'static [FieldSpec] {
        static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
            vec![
                FieldSpec::required("query", "", FieldKind::String),
                FieldSpec::optional("max_results", "", FieldKind::Integer, json!(10)),
                FieldSpec::optional("exact", "", FieldKind::Boolean, json!(false)),
                FieldSpec::optional("score", "", FieldKind::Number, Value::Null),
                FieldSpec::optional(
                    "safesearch",
                    "",
                    FieldKind::Enum(&["on", "moderate", "off"]),
                    json!("moderate"),
                ),
                FieldSpec::optional(
                    "labels",
                    "",
                    FieldKind::Array(Box::new(FieldKind::Integer)),
                    json!([]),
                ),
                FieldSpec::optional("window", "", FieldKind::Object(window_fields), Value::Null),
            ]
        });
        FIELDS.as_slice()
    }

    #[test]
    fn applies_defaults_for_missing_optional_fields() {
        let out = validate_arguments(search_fields(), &json!({ "query": "rust" })).unwrap();
        assert_eq!(
            out,
            json!({
                "query": "rust",
                "max_results": 10,
                "exact": false,
                "score": null,
                "safesearch": "moderate",
                "labels": [],
                "window": null
            })
        );
    }

    #[test]
    fn reports_every_missing_required_field() {
        fn pair() -> &'static [FieldSpec] {
            static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
                vec![
                    FieldSpec::required("a", "", FieldKind::Integer),
                    FieldSpec::required("b", "", FieldKind::Integer),
                ]
            });
            FIELDS.as_slice()
        }

        let issues = validate_arguments(pair(), &json!({})).unwrap_err();
        assert_eq!(
            issues,
            vec![
                FieldIssue::new("a", "field required"),
                FieldIssue::new("b", "field required"),
            ]
        );
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let issues = validate_arguments(search_fields(), &json!({ "query": null })).unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("query", "field required")]);
    }

    #[test]
    fn coerces_loose_scalars() {
        let out = validate_arguments(
            search_fields(),
            &json!({
                "query": "rust",
                "max_results": "25",
                "exact": "yes",
                "score": "0.5",
                "safesearch": "OFF",
                "labels": [1.0, "2"]
            }),
        )
        .unwrap();

        assert_eq!(out["max_results"], 25);
        assert_eq!(out["exact"], true);
        assert_eq!(out["score"], 0.5);
        assert_eq!(out["safesearch"], "off");
        assert_eq!(out["labels"], json!([1, 2]));
    }

    #[test]
    fn rejects_wrong_types_with_paths() {
        let issues = validate_arguments(
            search_fields(),
            &json!({
                "query": 42,
                "max_results": 2.5,
                "safesearch": "strict",
                "labels": [1, "x"],
                "window": { "days": "soon" }
            }),
        )
        .unwrap_err();

        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            ["query", "max_results", "safesearch", "labels[1]", "window.from", "window.days"]
        );
        assert_eq!(issues[0].message, "expected string, got integer");
        assert!(issues[2].message.contains("on, moderate, off"));
    }

    #[test]
    fn nested_objects_get_their_own_defaults() {
        let out = validate_arguments(
            search_fields(),
            &json!({ "query": "q", "window": { "from": "2024-01-01" } }),
        )
        .unwrap();
        assert_eq!(out["window"], json!({ "from": "2024-01-01", "days": 7 }));
    }

    #[test]
    fn null_params_mean_no_arguments() {
        let issues = validate_arguments(search_fields(), &Value::Null).unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("query", "field required")]);
    }

    #[test]
    fn non_object_params_are_rejected() {
        let issues = validate_arguments(search_fields(), &json!([1, 2])).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("got array"));
    }

    #[test]
    fn aliases_are_accepted_under_the_primary_name() {
        fn aliased() -> &'static [FieldSpec] {
            static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
                vec![FieldSpec::required("max_results", "", FieldKind::Integer)
                    .with_aliases(&["limit", "count"])]
            });
            FIELDS.as_slice()
        }

        let out = validate_arguments(aliased(), &json!({ "count": "3" })).unwrap();
        assert_eq!(out, json!({ "max_results": 3 }));

        let issues = validate_arguments(aliased(), &json!({ "limit": "many" })).unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("max_results", "expected integer, got string")]);
    }

    #[test]
    fn optional_fields_without_a_published_default_stay_absent() {
        fn unpublished() -> &'static [FieldSpec] {
            static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
                vec![FieldSpec {
                    default: None,
                    ..FieldSpec::optional("mode", "", FieldKind::Enum(&["fast", "slow"]), Value::Null)
                }]
            });
            FIELDS.as_slice()
        }

        let out = validate_arguments(unpublished(), &json!({})).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn unknown_keys_pass_through() {
        let out = validate_arguments(window_fields(), &json!({ "from": "x", "extra": 1 })).unwrap();
        assert_eq!(out["extra"], 1);
    }
}
