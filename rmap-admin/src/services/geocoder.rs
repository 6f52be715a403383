//! Address geocoding via a Nominatim-compatible search API
//!
//! Requests are rate limited to the configured minimum interval. A lookup
//! that finds nothing is retried once with suite/unit details stripped.
//! Results outside the deployment region count as "not found".

use rmap_common::config::GeocoderConfig;
use rmap_common::geo::RegionBounds;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding is disabled")]
    Disabled,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}")]
    ApiError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No match for address")]
    NotFound,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Minimum spacing between outgoing requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Geocoder rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

pub struct Geocoder {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    enabled: bool,
    bounds: RegionBounds,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig, bounds: RegionBounds) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval_ms)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enabled: config.enabled,
            bounds,
        })
    }

    /// Resolve an address to `(latitude, longitude)` inside the region
    pub async fn geocode(&self, address: &str) -> Result<(f64, f64), GeocodeError> {
        if !self.enabled {
            return Err(GeocodeError::Disabled);
        }

        if let Some(coords) = self.lookup_in_region(address).await? {
            return Ok(coords);
        }

        match clean_address(address) {
            Some(cleaned) if cleaned != address => {
                tracing::debug!(address = %address, cleaned = %cleaned, "Retrying with cleaned address");
                self.lookup_in_region(&cleaned)
                    .await?
                    .ok_or(GeocodeError::NotFound)
            }
            _ => Err(GeocodeError::NotFound),
        }
    }

    async fn lookup_in_region(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        let found = self.lookup(address).await?;
        Ok(found.filter(|(lat, long)| {
            let inside = self.bounds.contains(*lat, *long);
            if !inside {
                tracing::debug!(address = %address, lat, long, "Geocode result outside region");
            }
            inside
        }))
    }

    async fn lookup(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/search", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ApiError(status.as_u16()));
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };
        let lat = first
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;
        let long = first
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;
        Ok(Some((lat, long)))
    }
}

const UNIT_MARKERS: &[&str] = &["suite", "ste", "ste.", "unit", "apt", "apt.", "room", "rm", "#"];

/// Strip suite/unit/room designators from an address
///
/// Returns `None` when nothing is left to geocode.
pub fn clean_address(address: &str) -> Option<String> {
    let parts: Vec<String> = address
        .split(',')
        .map(str::trim)
        .filter_map(|part| {
            let words: Vec<&str> = part.split_whitespace().collect();
            let cut = words.iter().position(|w| {
                let lower = w.to_lowercase();
                w.starts_with('#') || UNIT_MARKERS.contains(&lower.as_str())
            });
            let kept = match cut {
                Some(i) => &words[..i],
                None => &words[..],
            };
            if kept.is_empty() {
                None
            } else {
                Some(kept.join(" "))
            }
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_address_strips_units() {
        assert_eq!(
            clean_address("123 Main St Suite 200, Casper, WY 82601").as_deref(),
            Some("123 Main St, Casper, WY 82601")
        );
        assert_eq!(
            clean_address("123 Main St, Unit B, Cheyenne, WY").as_deref(),
            Some("123 Main St, Cheyenne, WY")
        );
        assert_eq!(
            clean_address("500 Elm Ave #4, Laramie, WY").as_deref(),
            Some("500 Elm Ave, Laramie, WY")
        );
        assert_eq!(clean_address("Suite 5"), None);
    }

    #[tokio::test]
    async fn test_disabled_geocoder() {
        let config = GeocoderConfig {
            enabled: false,
            ..Default::default()
        };
        let geocoder = Geocoder::new(&config, RegionBounds::wyoming()).unwrap();
        assert!(matches!(
            geocoder.geocode("1 Main St, Casper, WY").await,
            Err(GeocodeError::Disabled)
        ));
    }
}
