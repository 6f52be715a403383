//! Batch validation against the listing schema
//!
//! Violations on coordinate fields are reported separately as warnings:
//! coordinates can be re-derived by geocoding, so they never block a batch.

use rmap_common::schema::{ListingSchema, COORDINATE_FIELDS};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ViolationKind {
    Missing,
    WrongType { expected: &'static str },
    NotAllowed { allowed: Vec<&'static str> },
    /// `guid` already used by an earlier row of the same batch
    Duplicate { first_row: usize },
}

/// One field-scoped problem in one uploaded row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// 1-based data row (header excluded)
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<i64>,
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn is_coordinate(&self) -> bool {
        COORDINATE_FIELDS.contains(&self.field)
    }
}

/// Violations split into blocking errors and ignorable coordinate warnings
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationOutcome {
    pub errors: Vec<Violation>,
    pub coordinate_warnings: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

fn check_record(row: usize, record: &Map<String, Value>, schema: &ListingSchema) -> Vec<Violation> {
    let guid = record.get("guid").and_then(Value::as_i64);
    let mut violations = Vec::new();

    for field in &schema.fields {
        let violation = |kind: ViolationKind, message: String| Violation {
            row,
            guid,
            field: field.name,
            kind,
            message,
        };

        let Some(value) = record.get(field.name) else {
            if field.required {
                violations.push(violation(
                    ViolationKind::Missing,
                    format!("{} is required", field.name),
                ));
            }
            continue;
        };

        if !field.field_type.matches(value) {
            violations.push(violation(
                ViolationKind::WrongType {
                    expected: field.field_type.name(),
                },
                format!("{} must be {}", field.name, field.field_type.name()),
            ));
            continue;
        }

        if !field.allowed.is_empty() {
            let ok = value
                .as_str()
                .map(|s| field.allowed.contains(&s))
                .unwrap_or(false);
            if !ok {
                violations.push(violation(
                    ViolationKind::NotAllowed {
                        allowed: field.allowed.to_vec(),
                    },
                    format!("{} must be one of: {}", field.name, field.allowed.join(", ")),
                ));
            }
        }
    }

    violations
}

/// Validate every record; never short-circuits
///
/// Repeated identifiers are reported in both modes: the listing tables key
/// on `guid`, so such a batch could never be staged.
pub fn validate_batch(records: &[Map<String, Value>], schema: &ListingSchema) -> ValidationOutcome {
    let mut first_seen: HashMap<i64, usize> = HashMap::new();
    let mut violations = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        violations.extend(check_record(row, record, schema));

        let Some(guid) = record.get("guid").and_then(Value::as_i64) else {
            continue;
        };
        match first_seen.get(&guid) {
            Some(&first_row) => violations.push(Violation {
                row,
                guid: Some(guid),
                field: "guid",
                kind: ViolationKind::Duplicate { first_row },
                message: format!("guid {} is already used in row {}", guid, first_row),
            }),
            None => {
                first_seen.insert(guid, row);
            }
        }
    }

    let (coordinate_warnings, errors): (Vec<Violation>, Vec<Violation>) =
        violations.into_iter().partition(Violation::is_coordinate);

    ValidationOutcome {
        errors,
        coordinate_warnings,
    }
}
