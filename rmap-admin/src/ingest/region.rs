//! Region outlier filter

use rmap_common::geo::{Gazetteer, RegionBounds, RegionDecision};
use serde_json::{Map, Value};

use super::transform::derive_city;

/// Numeric coordinates of a record, ignoring non-numeric values
pub fn record_coordinates(record: &Map<String, Value>) -> (Option<f64>, Option<f64>) {
    (
        record.get("latitude").and_then(Value::as_f64),
        record.get("longitude").and_then(Value::as_f64),
    )
}

/// Classify a record and annotate kept records with their derived city
pub fn apply_region_filter(
    record: &mut Map<String, Value>,
    bounds: &RegionBounds,
    gazetteer: &Gazetteer,
) -> RegionDecision {
    let (lat, long) = record_coordinates(record);
    let decision = bounds.classify(lat, long);
    if decision.keep() {
        derive_city(record, gazetteer);
    }
    decision
}
