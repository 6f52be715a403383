//! Raw row → canonical listing record

use rmap_common::geo::Gazetteer;
use rmap_common::listing::{split_category, split_cost_keywords};
use rmap_common::schema::{field_spec, FieldType};
use serde_json::{Map, Value};

use super::parser::RawRow;

/// Normalizes parsed rows using the listing schema's field types
pub struct RowTransformer<'a> {
    gazetteer: &'a Gazetteer,
    cost_vocabulary: &'a [String],
}

impl<'a> RowTransformer<'a> {
    pub fn new(gazetteer: &'a Gazetteer, cost_vocabulary: &'a [String]) -> Self {
        Self {
            gazetteer,
            cost_vocabulary,
        }
    }

    /// Build a canonical record from one raw row
    ///
    /// Empty cells become absent keys. Numeric cells that do not parse are
    /// kept as strings so validation reports the type mismatch. Unknown and
    /// derived columns in the upload are ignored.
    pub fn transform(&self, row: &RawRow) -> Map<String, Value> {
        let mut record = Map::new();

        for (key, raw) in row {
            if raw.is_empty() {
                continue;
            }
            let Some(spec) = field_spec(key) else {
                continue;
            };
            if spec.derived {
                continue;
            }
            if let Some(value) = coerce(spec.field_type, raw) {
                record.insert(key.clone(), value);
            }
        }

        self.derive_fields(&mut record);
        record
    }

    /// Compute `city`, `parent_category`/`sub_category` and the cost split
    pub fn derive_fields(&self, record: &mut Map<String, Value>) {
        derive_city(record, self.gazetteer);

        record.remove("parent_category");
        record.remove("sub_category");
        if let Some(category) = record.get("category").and_then(Value::as_str) {
            let (parent, sub) = split_category(category);
            record.insert("parent_category".into(), Value::String(parent));
            if let Some(sub) = sub {
                record.insert("sub_category".into(), Value::String(sub));
            }
        }

        let keywords = string_list(record.get("keywords"));
        let existing_cost = string_list(record.get("cost_keywords"));
        if keywords.is_none() && existing_cost.is_none() {
            return;
        }
        let (keywords, cost) = split_cost_keywords(
            keywords.unwrap_or_default(),
            existing_cost.unwrap_or_default(),
            self.cost_vocabulary,
        );
        set_list(record, "keywords", keywords);
        set_list(record, "cost_keywords", cost);
    }
}

/// Set `city` from the first gazetteer entry found in `full_address`
pub fn derive_city(record: &mut Map<String, Value>, gazetteer: &Gazetteer) {
    let city = record
        .get("full_address")
        .and_then(Value::as_str)
        .and_then(|address| gazetteer.city_for(address))
        .map(str::to_string);

    match city {
        Some(city) => {
            record.insert("city".into(), Value::String(city));
        }
        None => {
            record.remove("city");
        }
    }
}

fn coerce(field_type: FieldType, raw: &str) -> Option<Value> {
    let value = match field_type {
        FieldType::String => Value::String(raw.to_string()),
        FieldType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FieldType::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::from)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        FieldType::Array => {
            let mut items: Vec<String> = Vec::new();
            for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !items.iter().any(|existing| existing == item) {
                    items.push(item.to_string());
                }
            }
            if items.is_empty() {
                return None;
            }
            Value::from(items)
        }
    };
    Some(value)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn set_list(record: &mut Map<String, Value>, key: &str, items: Vec<String>) {
    if items.is_empty() {
        record.remove(key);
    } else {
        record.insert(key.to_string(), Value::from(items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmap_common::listing::default_cost_vocabulary;
    use serde_json::json;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn transform(pairs: &[(&str, &str)]) -> Map<String, Value> {
        let gazetteer = Gazetteer::default();
        let vocab = default_cost_vocabulary();
        RowTransformer::new(&gazetteer, &vocab).transform(&row(pairs))
    }

    #[test]
    fn test_empty_cells_become_absent() {
        let record = transform(&[
            ("guid", "1"),
            ("full_name", "Teen Center"),
            ("category", "Health: Mental Health"),
            ("latitude", ""),
            ("longitude", ""),
        ]);
        assert!(!record.contains_key("latitude"));
        assert!(!record.contains_key("longitude"));
        assert!(!record.contains_key("city"));
        assert_eq!(record["guid"], json!(1));
        assert_eq!(record["parent_category"], json!("Health"));
        assert_eq!(record["sub_category"], json!("Mental Health"));
    }

    #[test]
    fn test_numeric_parse_failure_kept_as_string() {
        let record = transform(&[("guid", "abc"), ("latitude", "42.1"), ("min_age", "12.5")]);
        assert_eq!(record["guid"], json!("abc"));
        assert_eq!(record["latitude"], json!(42.1));
        assert_eq!(record["min_age"], json!("12.5"));
    }

    #[test]
    fn test_array_split_dedup_and_cost_extraction() {
        let record = transform(&[
            ("keywords", "Free, Counseling, Counseling, ,Sliding Scale"),
            ("cost_keywords", "Sliding Scale"),
            ("languages_offered", "English,Spanish"),
        ]);
        assert_eq!(record["keywords"], json!(["Counseling"]));
        assert_eq!(record["cost_keywords"], json!(["Free", "Sliding Scale"]));
        assert_eq!(record["languages_offered"], json!(["English", "Spanish"]));
    }

    #[test]
    fn test_city_and_unknown_columns() {
        let record = transform(&[
            ("full_address", "123 Mills Ave, Casper, WY 82601"),
            ("favourite_colour", "blue"),
            ("city", "Nowhere"),
        ]);
        assert_eq!(record["city"], json!("Casper"));
        assert!(!record.contains_key("favourite_colour"));
    }
}
