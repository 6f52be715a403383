//! Configuration loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `RMAP_CONFIG` environment variable
//! 3. User config dir (`~/.config/rmap/config.toml` on Linux)
//! 4. `/etc/rmap/config.toml`
//!
//! A missing file is not fatal; compiled defaults are used instead.

use crate::geo::{Gazetteer, RegionBounds};
use crate::listing::default_cost_vocabulary;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RMAP_CONFIG";
/// Environment override for the database path
pub const DATABASE_ENV_VAR: &str = "RMAP_DATABASE";
/// Environment override for the email provider key
pub const SENDGRID_KEY_ENV_VAR: &str = "RMAP_SENDGRID_API_KEY";

/// Inclusive age band; `max: None` means open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
}

impl AgeBand {
    /// Whether `[lo, hi]` overlaps this band (missing ends are open)
    pub fn overlaps(&self, lo: Option<i64>, hi: Option<i64>) -> bool {
        let lo_ok = match (lo, self.max) {
            (Some(lo), Some(band_max)) => lo <= band_max,
            _ => true,
        };
        let hi_ok = match hi {
            Some(hi) => hi >= self.min,
            None => true,
        };
        lo_ok && hi_ok
    }
}

/// Youth and adult bands used by the age-group facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBands {
    pub youth: AgeBand,
    pub adult: AgeBand,
}

impl Default for AgeBands {
    fn default() -> Self {
        Self {
            youth: AgeBand { min: 0, max: Some(20) },
            adult: AgeBand { min: 18, max: None },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub base_url: String,
    pub user_agent: String,
    /// Minimum spacing between requests
    pub min_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("rmap/{}", env!("CARGO_PKG_VERSION")),
            min_interval_ms: 1000,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sendgrid_api_key: Option<String>,
    pub from_address: Option<String>,
    /// Receives "listings updated" notifications
    pub notify_address: Option<String>,
}

/// One auxiliary link shown alongside the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Deserialised `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: PathBuf,
    pub admin_bind: String,
    pub api_bind: String,
    /// Fallback acting user when a request carries no `X-Rmap-User`
    pub owner_email: String,
    pub region: RegionBounds,
    pub gazetteer: Gazetteer,
    pub age_bands: AgeBands,
    pub cost_vocabulary: Vec<String>,
    pub geocoder: GeocoderConfig,
    pub email: EmailConfig,
    pub image_root: PathBuf,
    pub staging_timeout_secs: u64,
    /// Parent category → icon name
    pub category_icons: BTreeMap<String, String>,
    pub resources: Vec<ResourceLink>,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database: default_data_dir().join("rmap.db"),
            admin_bind: "127.0.0.1:5050".to_string(),
            api_bind: "127.0.0.1:5051".to_string(),
            owner_email: "admin@localhost".to_string(),
            region: RegionBounds::default(),
            gazetteer: Gazetteer::default(),
            age_bands: AgeBands::default(),
            cost_vocabulary: default_cost_vocabulary(),
            geocoder: GeocoderConfig::default(),
            email: EmailConfig::default(),
            image_root: default_data_dir().join("images"),
            staging_timeout_secs: 120,
            category_icons: BTreeMap::new(),
            resources: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    pub fn staging_timeout(&self) -> Duration {
        Duration::from_secs(self.staging_timeout_secs)
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.region;
        if r.min_lat > r.max_lat || r.min_long > r.max_long {
            return Err(Error::Config(format!(
                "Region bounds are inverted: lat {}..{}, long {}..{}",
                r.min_lat, r.max_lat, r.min_long, r.max_long
            )));
        }
        if self.staging_timeout_secs == 0 {
            return Err(Error::Config(
                "staging_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `RMAP_DATABASE` / `RMAP_SENDGRID_API_KEY` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.trim().is_empty() {
                info!("Database path overridden by {}", DATABASE_ENV_VAR);
                self.database = PathBuf::from(path);
            }
        }
        if let Ok(key) = std::env::var(SENDGRID_KEY_ENV_VAR) {
            if !key.trim().is_empty() {
                self.email.sendgrid_api_key = Some(key);
            }
        }
    }
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: user then system config
    let user_config = dirs::config_dir().map(|d| d.join("rmap").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    let system_config = PathBuf::from("/etc/rmap/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load configuration, falling back to compiled defaults
///
/// An explicitly named file (CLI or env) that cannot be read is an error;
/// an absent default-location file is not.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let explicit = cli_arg.is_some() || std::env::var(CONFIG_ENV_VAR).is_ok();

    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            info!("Loaded configuration from {}", path.display());
            TomlConfig::from_toml_str(&content)?
        }
        Some(path) if explicit => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        _ => {
            warn!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    Ok(config)
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rmap"))
        .unwrap_or_else(|| PathBuf::from("./rmap_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_band_overlap() {
        let bands = AgeBands::default();
        assert!(bands.youth.overlaps(Some(12), Some(18)));
        assert!(!bands.youth.overlaps(Some(25), Some(64)));
        assert!(bands.adult.overlaps(Some(16), Some(24)));
        assert!(!bands.adult.overlaps(Some(5), Some(12)));
        // Open-ended ranges
        assert!(bands.youth.overlaps(None, Some(10)));
        assert!(bands.adult.overlaps(Some(60), None));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            owner_email = "staff@example.org"
            staging_timeout_secs = 30

            [region]
            min_lat = 41.0
            max_lat = 42.0
            min_long = -105.0
            max_long = -104.0
            "#,
        )
        .unwrap();

        assert_eq!(config.owner_email, "staff@example.org");
        assert_eq!(config.staging_timeout(), Duration::from_secs(30));
        assert_eq!(config.region.min_lat, 41.0);
        assert_eq!(config.gazetteer, Gazetteer::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_inverted_region_rejected() {
        let err = TomlConfig::from_toml_str(
            r#"
            [region]
            min_lat = 45.0
            max_lat = 41.0
            min_long = -111.0
            max_long = -104.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
