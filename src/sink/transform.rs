//! Record transformer
//!
//! Makes a row conform to its stream schema before emission:
//! - fields absent from the schema's `properties` are dropped
//! - fields deselected in catalog metadata are dropped (automatic fields are kept)
//! - values are checked against their declared types, with lossless
//!   coercions (numeric strings, whole floats, date-time normalization)

use crate::catalog::MetadataEntry;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Timestamp layouts accepted for `format: date-time` besides RFC 3339
const NAIVE_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Transform one row against `schema` and the stream's `metadata`
pub fn transform_record(
    stream: &str,
    row: Row,
    schema: &JsonValue,
    metadata: &[MetadataEntry],
) -> Result<Row> {
    let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) else {
        return Ok(row);
    };

    let mut out = Row::new();
    for (field, value) in row {
        let Some(field_schema) = properties.get(&field) else {
            continue;
        };
        if !field_selected(metadata, &field) {
            continue;
        }
        let value = coerce(value, field_schema)
            .map_err(|message| Error::validation(stream, field.as_str(), message))?;
        out.insert(field, value);
    }
    Ok(out)
}

fn field_selected(metadata: &[MetadataEntry], field: &str) -> bool {
    let Some(entry) = metadata.iter().find(|m| {
        m.breadcrumb.len() == 2 && m.breadcrumb[0] == "properties" && m.breadcrumb[1] == field
    }) else {
        return true;
    };

    match entry.metadata.get("inclusion").and_then(JsonValue::as_str) {
        Some("automatic") => return true,
        Some("unsupported") => return false,
        _ => {}
    }
    entry
        .metadata
        .get("selected")
        .and_then(JsonValue::as_bool)
        .unwrap_or(true)
}

fn declared_types(schema: &JsonValue) -> Option<Vec<&str>> {
    match schema.get("type")? {
        JsonValue::String(t) => Some(vec![t.as_str()]),
        JsonValue::Array(types) => Some(types.iter().filter_map(JsonValue::as_str).collect()),
        _ => None,
    }
}

fn coerce(value: JsonValue, schema: &JsonValue) -> std::result::Result<JsonValue, String> {
    let Some(types) = declared_types(schema) else {
        return Ok(value);
    };

    if value.is_null() {
        return if types.contains(&"null") {
            Ok(JsonValue::Null)
        } else {
            Err("null is not allowed".to_string())
        };
    }

    let mut last_error = None;
    for ty in types.iter().filter(|t| **t != "null") {
        match coerce_to(&value, ty, schema) {
            Ok(v) => return Ok(v),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| format!("{value} does not match {types:?}")))
}

fn coerce_to(value: &JsonValue, ty: &str, schema: &JsonValue) -> std::result::Result<JsonValue, String> {
    let mismatch = || format!("expected {ty}, got {value}");
    match (ty, value) {
        ("string", JsonValue::String(s)) => {
            if schema.get("format").and_then(JsonValue::as_str) == Some("date-time") {
                normalize_date_time(s).map(JsonValue::String)
            } else {
                Ok(value.clone())
            }
        }
        ("string", JsonValue::Number(n)) => Ok(JsonValue::String(n.to_string())),
        ("string", JsonValue::Bool(b)) => Ok(JsonValue::String(b.to_string())),

        ("integer", JsonValue::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Ok(value.clone())
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(JsonValue::from(f as i64)),
                    _ => Err(mismatch()),
                }
            }
        }
        ("integer", JsonValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(JsonValue::from)
            .map_err(|_| mismatch()),

        ("number", JsonValue::Number(_)) => Ok(value.clone()),
        ("number", JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .ok_or_else(mismatch),

        ("boolean", JsonValue::Bool(_)) => Ok(value.clone()),
        ("boolean", JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(JsonValue::Bool(true)),
            "false" => Ok(JsonValue::Bool(false)),
            _ => Err(mismatch()),
        },

        ("object", JsonValue::Object(map)) => coerce_object(map, schema).map(JsonValue::Object),

        ("array", JsonValue::Array(items)) => {
            let item_schema = schema.get("items");
            items
                .iter()
                .map(|item| match item_schema {
                    Some(s) => coerce(item.clone(), s),
                    None => Ok(item.clone()),
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(JsonValue::Array)
        }

        _ => Err(mismatch()),
    }
}

fn coerce_object(map: &JsonObject, schema: &JsonValue) -> std::result::Result<JsonObject, String> {
    let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) else {
        return Ok(map.clone());
    };

    let mut out = JsonObject::new();
    for (key, value) in map {
        if let Some(prop) = properties.get(key) {
            let v = coerce(value.clone(), prop).map_err(|e| format!("{key}: {e}"))?;
            out.insert(key.clone(), v);
        }
    }
    Ok(out)
}

/// Normalize a timestamp to RFC 3339 UTC
fn normalize_date_time(raw: &str) -> std::result::Result<String, String> {
    let utc = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Some(naive) = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        naive.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date-time '{raw}'"))?
            .and_utc()
    } else {
        return Err(format!("invalid date-time '{raw}'"));
    };
    Ok(utc.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn row(value: JsonValue) -> Row {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn schema() -> JsonValue {
        json!({
            "type": ["null", "object"],
            "properties": {
                "ID": {"type": ["integer"]},
                "NAME": {"type": ["null", "string"]},
                "AMOUNT": {"type": ["null", "number"]},
                "ACTIVE": {"type": ["null", "boolean"]},
                "UPDATED": {"type": ["null", "string"], "format": "date-time"},
                "TAGS": {"type": ["null", "array"], "items": {"type": ["string"]}}
            }
        })
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let out = transform_record(
            "s",
            row(json!({"ID": 1, "NAME": "a", "EXTRA": true})),
            &schema(),
            &[],
        )
        .unwrap();
        assert_eq!(JsonValue::Object(out), json!({"ID": 1, "NAME": "a"}));
    }

    #[test]
    fn test_deselected_fields_dropped() {
        let mut entry = CatalogEntry::discovered("s", "ID", schema());
        for m in &mut entry.metadata {
            if m.breadcrumb.len() == 2 {
                m.metadata.insert("selected".into(), json!(false));
            }
        }
        let out = transform_record(
            "s",
            row(json!({"ID": 7, "NAME": "a", "AMOUNT": 1.5})),
            &entry.schema,
            &entry.metadata,
        )
        .unwrap();
        // automatic id field survives deselection
        assert_eq!(JsonValue::Object(out), json!({"ID": 7}));
    }

    #[test_case(json!("12"), json!(12) ; "numeric string")]
    #[test_case(json!(3.0), json!(3) ; "whole float")]
    #[test_case(json!(5), json!(5) ; "integer")]
    fn test_integer_coercion(input: JsonValue, expected: JsonValue) {
        let out = transform_record("s", row(json!({"ID": input})), &schema(), &[]).unwrap();
        assert_eq!(out["ID"], expected);
    }

    #[test_case("2024-01-02T03:04:05Z", "2024-01-02T03:04:05Z" ; "rfc3339")]
    #[test_case("2024-01-02T05:04:05+02:00", "2024-01-02T03:04:05Z" ; "offset")]
    #[test_case("2024-01-02 03:04:05", "2024-01-02T03:04:05Z" ; "insightly layout")]
    #[test_case("2024-01-02", "2024-01-02T00:00:00Z" ; "date only")]
    fn test_date_time_normalized(input: &str, expected: &str) {
        let out = transform_record("s", row(json!({"UPDATED": input})), &schema(), &[]).unwrap();
        assert_eq!(out["UPDATED"], expected);
    }

    #[test]
    fn test_other_coercions() {
        let out = transform_record(
            "s",
            row(json!({"AMOUNT": "2.5", "ACTIVE": "TRUE", "NAME": 10, "TAGS": ["a"]})),
            &schema(),
            &[],
        )
        .unwrap();
        assert_eq!(
            JsonValue::Object(out),
            json!({"AMOUNT": 2.5, "ACTIVE": true, "NAME": "10", "TAGS": ["a"]})
        );
    }

    #[test_case(json!({"ID": null}), "ID" ; "null where not allowed")]
    #[test_case(json!({"ID": "abc"}), "ID" ; "non numeric id")]
    #[test_case(json!({"ID": 1.5}), "ID" ; "fractional id")]
    #[test_case(json!({"UPDATED": "yesterday"}), "UPDATED" ; "bad timestamp")]
    #[test_case(json!({"TAGS": [{"a": 1}]}), "TAGS" ; "bad array item")]
    #[test_case(json!({"ACTIVE": [true]}), "ACTIVE" ; "wrong type")]
    fn test_validation_errors(input: JsonValue, bad_field: &str) {
        let err = transform_record("contacts", row(input), &schema(), &[]).unwrap_err();
        match err {
            Error::Validation {
                resource, field, ..
            } => {
                assert_eq!(resource, "contacts");
                assert_eq!(field, bad_field);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nulls_allowed() {
        let out = transform_record(
            "s",
            row(json!({"NAME": null, "UPDATED": null})),
            &schema(),
            &[],
        )
        .unwrap();
        assert_eq!(JsonValue::Object(out), json!({"NAME": null, "UPDATED": null}));
    }

    #[test]
    fn test_schema_without_properties_passes_through() {
        let input = row(json!({"anything": [1, 2]}));
        let out = transform_record("s", input.clone(), &json!({"type": "object"}), &[]).unwrap();
        assert_eq!(out, input);
    }
}
