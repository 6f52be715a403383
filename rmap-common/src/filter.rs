//! In-memory listing filter
//!
//! Facets compose by logical AND. An unset facet imposes no constraint, and
//! the output preserves input order.

use serde::{Deserialize, Serialize};

use crate::config::AgeBands;
use crate::listing::Listing;

/// Age-group facet selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgeGroup {
    /// Facet disabled
    #[default]
    #[serde(rename = "all", alias = "All")]
    All,
    Youth,
    Adult,
}

impl AgeGroup {
    /// Parse a query value; anything unrecognised disables the facet
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "youth" => AgeGroup::Youth,
            "adult" => AgeGroup::Adult,
            _ => AgeGroup::All,
        }
    }
}

/// One set of active filter selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    /// Case-insensitive substring over every field value
    pub search: Option<String>,
    /// Exact combined `"parent: sub"` category
    pub category: Option<String>,
    /// Keyword/tag, substring-matched against the flattened record
    ///
    /// Only field values are searched; field names never match a tag.
    pub tag: Option<String>,
    /// Membership in `cost_keywords`
    pub cost: Option<String>,
    /// Exact derived city
    pub city: Option<String>,
    pub age_group: AgeGroup,
    /// When false, records tagged faith-based are excluded
    pub include_faith_based: bool,
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            tag: None,
            cost: None,
            city: None,
            age_group: AgeGroup::All,
            include_faith_based: true,
        }
    }
}

fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ListingFilter {
    /// No facet constrains anything
    pub fn is_empty(&self) -> bool {
        *self == ListingFilter::default()
    }

    /// Copy keeping only the dropdown facets (category, tag, cost, city)
    ///
    /// Facet counts shown next to the dropdowns are computed over this
    /// subset, ignoring search text, age group and the faith toggle.
    pub fn dropdown_facets(&self) -> ListingFilter {
        ListingFilter {
            category: self.category.clone(),
            tag: self.tag.clone(),
            cost: self.cost.clone(),
            city: self.city.clone(),
            ..ListingFilter::default()
        }
    }

    pub fn matches(&self, listing: &Listing, bands: &AgeBands) -> bool {
        if !self.include_faith_based && listing.is_faith_based() {
            return false;
        }

        if let Some(category) = selected(&self.category) {
            if listing.category != category {
                return false;
            }
        }

        if let Some(cost) = selected(&self.cost) {
            if !listing.cost_keywords.iter().any(|c| c == cost) {
                return false;
            }
        }

        if let Some(city) = selected(&self.city) {
            if listing.city.as_deref() != Some(city) {
                return false;
            }
        }

        if !self.matches_age_group(listing, bands) {
            return false;
        }

        let search = selected(&self.search);
        let tag = selected(&self.tag);
        if search.is_some() || tag.is_some() {
            let text = listing.flattened_text();
            for needle in [search, tag].into_iter().flatten() {
                if !text.contains(&needle.to_lowercase()) {
                    return false;
                }
            }
        }

        true
    }

    fn matches_age_group(&self, listing: &Listing, bands: &AgeBands) -> bool {
        let (band, label) = match self.age_group {
            AgeGroup::All => return true,
            AgeGroup::Youth => (&bands.youth, "youth"),
            AgeGroup::Adult => (&bands.adult, "adult"),
        };

        if listing.min_age.is_none() && listing.max_age.is_none() {
            // No range on record; fall back to the declared group, if any
            return match listing.age_group.as_deref() {
                Some(group) => group.to_lowercase().contains(label),
                None => true,
            };
        }

        band.overlaps(listing.min_age, listing.max_age)
    }
}

/// Apply every filter in `filters` (AND) to `listings`
pub fn filter_listings<'a>(
    listings: &'a [Listing],
    filters: &[ListingFilter],
    bands: &AgeBands,
) -> Vec<&'a Listing> {
    listings
        .iter()
        .filter(|listing| filters.iter().all(|f| f.matches(listing, bands)))
        .collect()
}
