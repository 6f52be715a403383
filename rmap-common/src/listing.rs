//! Listing model and derived fields
//!
//! A `Listing` is one resource entry on the map. Field names match the
//! columns declared in `schema::LISTING_FIELDS`, so a listing round-trips
//! through its JSON record form without renaming.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::Gazetteer;
use crate::Result;

/// Keyword that marks a faith-based organisation
pub const FAITH_BASED_TAG: &str = "Faith-Based";

/// Sub-category bucket for categories without a `"parent: sub"` split
pub const GENERAL_SUB_CATEGORY: &str = "General";

/// One resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub guid: i64,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_organization: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_label_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_label_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_line_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_line_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_email: Option<String>,

    // Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    // Eligibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,

    // Set-valued fields (unique, order not meaningful)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cost_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages_offered: Vec<String>,

    // Notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Organisational user that owns this listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<i64>,
}

impl Listing {
    /// Minimal listing; everything optional left empty
    pub fn new(guid: i64, full_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            guid,
            full_name: full_name.into(),
            parent_organization: None,
            category: category.into(),
            parent_category: None,
            sub_category: None,
            description: None,
            phone_1: None,
            phone_label_1: None,
            phone_2: None,
            phone_label_2: None,
            crisis_line_number: None,
            crisis_line_label: None,
            website: None,
            program_email: None,
            full_address: None,
            city: None,
            latitude: None,
            longitude: None,
            min_age: None,
            max_age: None,
            age_group: None,
            keywords: Vec::new(),
            cost_keywords: Vec::new(),
            languages_offered: Vec::new(),
            eligibility_requirements: None,
            financial_information: None,
            intake_instructions: None,
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            image_url: None,
            managed_by: None,
        }
    }

    /// Build a listing from a canonical record (absent keys → `None`)
    pub fn from_record(record: Map<String, Value>) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    /// Canonical record form; absent values are omitted
    pub fn to_record(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(crate::Error::Internal(
                "listing did not serialize to an object".to_string(),
            )),
        }
    }

    /// Both coordinates, when present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Lower-cased concatenation of every field value
    ///
    /// Used for free-text search and tag matching.
    pub fn flattened_text(&self) -> String {
        fn push_value(out: &mut String, value: &Value) {
            match value {
                Value::String(s) => {
                    out.push_str(s);
                    out.push(' ');
                }
                Value::Array(items) => items.iter().for_each(|v| push_value(out, v)),
                Value::Number(n) => {
                    out.push_str(&n.to_string());
                    out.push(' ');
                }
                Value::Bool(b) => {
                    out.push_str(if *b { "true " } else { "false " });
                }
                Value::Null | Value::Object(_) => {}
            }
        }

        let mut out = String::new();
        if let Ok(Value::Object(map)) = serde_json::to_value(self) {
            for value in map.values() {
                push_value(&mut out, value);
            }
        }
        out.to_lowercase()
    }

    pub fn is_faith_based(&self) -> bool {
        self.keywords
            .iter()
            .any(|k| k.eq_ignore_ascii_case(FAITH_BASED_TAG))
    }

    /// Recompute `city`, `parent_category`/`sub_category` and the cost split
    pub fn apply_derived_fields(&mut self, gazetteer: &Gazetteer, cost_vocabulary: &[String]) {
        self.city = self
            .full_address
            .as_deref()
            .and_then(|address| gazetteer.city_for(address))
            .map(str::to_string);

        let (parent, sub) = split_category(&self.category);
        self.parent_category = Some(parent);
        self.sub_category = sub;

        let (keywords, cost) = split_cost_keywords(
            std::mem::take(&mut self.keywords),
            std::mem::take(&mut self.cost_keywords),
            cost_vocabulary,
        );
        self.keywords = keywords;
        self.cost_keywords = cost;
    }

    /// Parent category, falling back to the whole category string
    pub fn parent_category_or_category(&self) -> &str {
        self.parent_category.as_deref().unwrap_or(&self.category)
    }

    pub fn sub_category_or_general(&self) -> &str {
        self.sub_category.as_deref().unwrap_or(GENERAL_SUB_CATEGORY)
    }
}

/// Split `"Parent: Sub"` into its two halves
///
/// A category without the `": "` separator is its own parent with no sub.
pub fn split_category(category: &str) -> (String, Option<String>) {
    match category.split_once(": ") {
        Some((parent, sub)) => (parent.trim().to_string(), Some(sub.trim().to_string())),
        None => (category.trim().to_string(), None),
    }
}

/// Move cost-related keywords into the cost set
///
/// Returns `(keywords, cost_keywords)`. Cost tags pulled out of `keywords`
/// come first, followed by any pre-existing cost tags not already present.
pub fn split_cost_keywords(
    keywords: Vec<String>,
    existing_cost: Vec<String>,
    cost_vocabulary: &[String],
) -> (Vec<String>, Vec<String>) {
    let (cost_from_keywords, remaining): (Vec<String>, Vec<String>) = keywords
        .into_iter()
        .partition(|k| cost_vocabulary.iter().any(|c| c == k));

    let mut cost = Vec::with_capacity(cost_from_keywords.len() + existing_cost.len());
    for tag in cost_from_keywords.into_iter().chain(existing_cost) {
        if !cost.contains(&tag) {
            cost.push(tag);
        }
    }

    (remaining, cost)
}

/// Default cost vocabulary
pub fn default_cost_vocabulary() -> Vec<String> {
    [
        "Low Cost",
        "Free",
        "OHP",
        "Accepts Uninsured",
        "Sliding Scale",
        "Financial Aid Available",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
