//! Reuse of previously geocoded coordinates

use rmap_common::db::GeocodeCacheEntry;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Copy cached coordinates onto a record whose address is unchanged
///
/// A cache hit requires the same `guid` and a byte-identical `full_address`.
/// Records without a hit keep whatever coordinates they already carry.
/// Returns whether coordinates were copied.
pub fn merge_cached_coordinates(
    record: &mut Map<String, Value>,
    cache: &HashMap<i64, GeocodeCacheEntry>,
) -> bool {
    let Some(guid) = record.get("guid").and_then(Value::as_i64) else {
        return false;
    };
    let Some(entry) = cache.get(&guid) else {
        return false;
    };
    let same_address = record
        .get("full_address")
        .and_then(Value::as_str)
        .map(|address| address == entry.full_address)
        .unwrap_or(false);
    if !same_address {
        return false;
    }

    record.insert("latitude".into(), Value::from(entry.latitude));
    record.insert("longitude".into(), Value::from(entry.longitude));
    true
}
