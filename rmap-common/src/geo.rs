//! Region bounding box and gazetteer
//!
//! Coordinates are only trusted when they fall inside the deployment's
//! bounding box; anything outside is treated as an outlier. City names are
//! derived by substring matching the address against a fixed, ordered list
//! of known places.

use serde::{Deserialize, Serialize};

/// Static per-deployment bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

/// Outcome of checking a record's coordinates against the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionDecision {
    /// Both coordinates present and inside the box
    Inside,
    /// Both coordinates present and outside the box
    Outside,
    /// At least one coordinate missing; the record is not mappable
    Unmapped,
}

impl RegionDecision {
    /// Records are kept unless they are positively outside the box
    pub fn keep(self) -> bool {
        !matches!(self, RegionDecision::Outside)
    }
}

impl RegionBounds {
    /// Inclusive containment test
    pub fn contains(&self, lat: f64, long: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && long >= self.min_long && long <= self.max_long
    }

    pub fn classify(&self, latitude: Option<f64>, longitude: Option<f64>) -> RegionDecision {
        match (latitude, longitude) {
            (Some(lat), Some(long)) if self.contains(lat, long) => RegionDecision::Inside,
            (Some(_), Some(_)) => RegionDecision::Outside,
            _ => RegionDecision::Unmapped,
        }
    }

    /// Wyoming, the default deployment
    pub fn wyoming() -> Self {
        Self {
            min_lat: 40.9,
            max_lat: 45.1,
            min_long: -111.2,
            max_long: -104.0,
        }
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::wyoming()
    }
}

/// Ordered list of known city names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gazetteer(Vec<String>);

impl Gazetteer {
    pub fn new<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(cities.into_iter().map(Into::into).collect())
    }

    /// First gazetteer entry contained in the address, if any
    pub fn city_for(&self, address: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|city| address.contains(city.as_str()))
            .map(String::as_str)
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::new([
            "Casper",
            "Cheyenne",
            "Laramie",
            "Gillette",
            "Rock Springs",
            "Sheridan",
            "Green River",
            "Evanston",
            "Riverton",
            "Jackson",
            "Cody",
            "Rawlins",
            "Lander",
            "Torrington",
            "Powell",
            "Douglas",
            "Worland",
            "Buffalo",
            "Wheatland",
            "Newcastle",
            "Mills",
            "Evansville",
            "Bar Nunn",
            "Glenrock",
            "Thermopolis",
            "Kemmerer",
            "Lusk",
            "Pinedale",
        ])
    }
}
