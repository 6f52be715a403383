//! Facet counts for the filter controls
//!
//! All tallies iterate in first-seen order so the serialized JSON objects
//! are stable for a given input.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use crate::geo::Gazetteer;
use crate::listing::Listing;

/// Insertion-ordered string → count map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMap {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl CountMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, n: usize) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += n,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), n));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }
}

impl Serialize for CountMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, n)| (k, n)))
    }
}

/// `parent_category → sub_category → count`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    parents: Vec<(String, CountMap)>,
}

impl CategoryCounts {
    fn increment(&mut self, parent: &str, sub: &str) {
        match self.parents.iter_mut().find(|(p, _)| p == parent) {
            Some((_, subs)) => subs.increment(sub),
            None => {
                let mut subs = CountMap::new();
                subs.increment(sub);
                self.parents.push((parent.to_string(), subs));
            }
        }
    }

    pub fn sub_counts(&self, parent: &str) -> Option<&CountMap> {
        self.parents
            .iter()
            .find(|(p, _)| p == parent)
            .map(|(_, subs)| subs)
    }

    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().map(|(p, _)| p.as_str())
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parents.len()))?;
        for (parent, subs) in &self.parents {
            map.serialize_entry(parent, subs)?;
        }
        map.end()
    }
}

/// Per-gazetteer-city counts; zero-count cities are omitted
///
/// City names compare case-insensitively and are reported with the
/// gazetteer's spelling, in gazetteer order.
pub fn city_counts(listings: &[&Listing], gazetteer: &Gazetteer) -> CountMap {
    let mut counts = CountMap::new();
    for city in gazetteer.cities() {
        let n = listings
            .iter()
            .filter(|l| {
                l.city
                    .as_deref()
                    .map(|c| c.eq_ignore_ascii_case(city))
                    .unwrap_or(false)
            })
            .count();
        if n > 0 {
            counts.add(city, n);
        }
    }
    counts
}

pub fn keyword_counts(listings: &[&Listing]) -> CountMap {
    let mut counts = CountMap::new();
    for keyword in listings.iter().flat_map(|l| l.keywords.iter()) {
        counts.increment(keyword);
    }
    counts
}

pub fn cost_counts(listings: &[&Listing]) -> CountMap {
    let mut counts = CountMap::new();
    for tag in listings.iter().flat_map(|l| l.cost_keywords.iter()) {
        counts.increment(tag);
    }
    counts
}

pub fn category_counts(listings: &[&Listing]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for listing in listings {
        counts.increment(
            listing.parent_category_or_category(),
            listing.sub_category_or_general(),
        );
    }
    counts
}

/// Every facet tally for one listing subset
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FacetCounts {
    pub categories: CategoryCounts,
    pub cities: CountMap,
    pub keywords: CountMap,
    pub costs: CountMap,
}

impl FacetCounts {
    pub fn compute(listings: &[&Listing], gazetteer: &Gazetteer) -> Self {
        Self {
            categories: category_counts(listings),
            cities: city_counts(listings, gazetteer),
            keywords: keyword_counts(listings),
            costs: cost_counts(listings),
        }
    }
}
