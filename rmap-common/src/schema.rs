//! Listing schema definition
//!
//! Single source of truth for the shape of a listing record. The CSV row
//! transformer, the upload validator and the listing tables all read the
//! same `LISTING_FIELDS` table, so adding a field is a one-line change here.
//!
//! Two validation variants exist:
//! - **strict**: every declared field is type-checked, strict-required
//!   fields must be present, enumerated fields must hold an allowed value
//! - **relaxed**: only the minimal identity fields are checked (the upload
//!   escape hatch)

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Bumped whenever `LISTING_FIELDS` changes shape
pub const LISTING_SCHEMA_VERSION: i64 = 1;

/// Declared type of a listing field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    /// Ordered list of unique strings
    Array,
    Boolean,
}

impl FieldType {
    /// Column type used for this field in the listing tables
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::String => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Number => "REAL",
            // JSON array text
            FieldType::Array => "TEXT",
            FieldType::Boolean => "INTEGER",
        }
    }

    /// Name used in validation messages and the schema document
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Boolean => "boolean",
        }
    }

    /// Whether a JSON value conforms to this type
    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Array => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

/// When a field must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Optional,
    /// Required by the strict schema only
    Strict,
    /// Required by both strict and relaxed schemas
    Always,
}

/// Declaration of one listing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub requirement: Requirement,
    /// Enumerated values (empty = unconstrained)
    pub allowed: &'static [&'static str],
    /// Computed during ingestion, never read from the upload
    pub derived: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            requirement: Requirement::Optional,
            allowed: &[],
            derived: false,
        }
    }

    const fn always_required(self) -> Self {
        Self {
            requirement: Requirement::Always,
            ..self
        }
    }

    const fn strict_required(self) -> Self {
        Self {
            requirement: Requirement::Strict,
            ..self
        }
    }

    const fn one_of(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed, ..self }
    }

    const fn derived(self) -> Self {
        Self {
            derived: true,
            ..self
        }
    }

    /// Column is NOT NULL only when even the relaxed schema requires it
    pub fn not_null(&self) -> bool {
        self.requirement == Requirement::Always
    }
}

/// Allowed values of `age_group`
pub const AGE_GROUPS: &[&str] = &["Youth", "Adult", "Youth and Adult"];

/// Every column of the listing tables, in column order
pub const LISTING_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("guid", FieldType::Integer).always_required(),
    FieldSpec::new("full_name", FieldType::String).always_required(),
    FieldSpec::new("parent_organization", FieldType::String),
    FieldSpec::new("category", FieldType::String).always_required(),
    FieldSpec::new("parent_category", FieldType::String).derived(),
    FieldSpec::new("sub_category", FieldType::String).derived(),
    FieldSpec::new("description", FieldType::String).strict_required(),
    FieldSpec::new("phone_1", FieldType::String),
    FieldSpec::new("phone_label_1", FieldType::String),
    FieldSpec::new("phone_2", FieldType::String),
    FieldSpec::new("phone_label_2", FieldType::String),
    FieldSpec::new("crisis_line_number", FieldType::String),
    FieldSpec::new("crisis_line_label", FieldType::String),
    FieldSpec::new("website", FieldType::String),
    FieldSpec::new("program_email", FieldType::String),
    FieldSpec::new("full_address", FieldType::String),
    FieldSpec::new("city", FieldType::String).derived(),
    FieldSpec::new("latitude", FieldType::Number),
    FieldSpec::new("longitude", FieldType::Number),
    FieldSpec::new("min_age", FieldType::Integer),
    FieldSpec::new("max_age", FieldType::Integer),
    FieldSpec::new("age_group", FieldType::String).one_of(AGE_GROUPS),
    FieldSpec::new("keywords", FieldType::Array),
    FieldSpec::new("cost_keywords", FieldType::Array),
    FieldSpec::new("languages_offered", FieldType::Array),
    FieldSpec::new("eligibility_requirements", FieldType::String),
    FieldSpec::new("financial_information", FieldType::String),
    FieldSpec::new("intake_instructions", FieldType::String),
    FieldSpec::new("contact_name", FieldType::String),
    FieldSpec::new("contact_email", FieldType::String),
    FieldSpec::new("contact_phone", FieldType::String),
    FieldSpec::new("image_url", FieldType::String),
    FieldSpec::new("managed_by", FieldType::Integer),
];

/// Look up a field declaration by canonical key
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    LISTING_FIELDS.iter().find(|f| f.name == name)
}

/// Fields holding coordinates; violations on these never block an upload
pub const COORDINATE_FIELDS: &[&str] = &["latitude", "longitude"];

/// Which variant of the schema to validate against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    Strict,
    Relaxed,
}

/// One field as seen by a particular validation mode
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub allowed: &'static [&'static str],
}

/// A concrete validation schema (strict or relaxed view of `LISTING_FIELDS`)
#[derive(Debug, Clone)]
pub struct ListingSchema {
    pub mode: ValidationMode,
    pub fields: Vec<SchemaField>,
}

impl ListingSchema {
    pub fn for_mode(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Strict => Self::strict(),
            ValidationMode::Relaxed => Self::relaxed(),
        }
    }

    /// Full schema: all non-derived fields
    pub fn strict() -> Self {
        let fields = LISTING_FIELDS
            .iter()
            .filter(|f| !f.derived)
            .map(|f| SchemaField {
                name: f.name,
                field_type: f.field_type,
                required: f.requirement != Requirement::Optional,
                allowed: f.allowed,
            })
            .collect();

        Self {
            mode: ValidationMode::Strict,
            fields,
        }
    }

    /// Reduced schema: only the fields the relaxed mode still requires
    pub fn relaxed() -> Self {
        let fields = LISTING_FIELDS
            .iter()
            .filter(|f| f.requirement == Requirement::Always)
            .map(|f| SchemaField {
                name: f.name,
                field_type: f.field_type,
                required: true,
                allowed: &[],
            })
            .collect();

        Self {
            mode: ValidationMode::Relaxed,
            fields,
        }
    }

    /// Schema document published to CSV authors
    ///
    /// Shape: `{"version": N, "mode": "...", "properties": {name: {type, required, enum?}}}`
    pub fn to_document(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut entry = json!({
                "type": field.field_type.name(),
                "required": field.required,
            });
            if !field.allowed.is_empty() {
                entry["enum"] = json!(field.allowed);
            }
            properties.insert(field.name.to_string(), entry);
        }

        json!({
            "version": LISTING_SCHEMA_VERSION,
            "mode": self.mode,
            "properties": properties,
        })
    }
}
