use anyhow::{Context, Result, anyhow, bail};
use chrono_tz::Tz;
use scraper::Selector;
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let pricing = &self.pricing;
        if !(pricing.day_price.is_finite() && pricing.day_price > 0.0) {
            bail!("pricing.day_price must be a positive amount");
        }
        if !(pricing.night_price.is_finite() && pricing.night_price > 0.0) {
            bail!("pricing.night_price must be a positive amount");
        }
        if pricing.night_start_hour > 23 {
            bail!("pricing.night_start_hour must be between 0 and 23");
        }

        if self.venue.opening_hour >= self.venue.closing_hour || self.venue.closing_hour > 24 {
            bail!(
                "venue opening hour {} must be before closing hour {} (max 24)",
                self.venue.opening_hour,
                self.venue.closing_hour
            );
        }
        if self.venue.base_url.trim().is_empty() {
            bail!("venue.base_url must not be empty");
        }
        if let Some(timezone) = &self.venue.timezone {
            timezone
                .parse::<Tz>()
                .map_err(|err| anyhow!("invalid venue.timezone {timezone}: {err}"))?;
        }

        if self.fetch.mode == FetchMode::File && self.fetch.file_path.is_none() {
            bail!("fetch.file_path is required for file mode");
        }

        Selector::parse(&self.parse.row_selector).map_err(|err| {
            anyhow!(
                "invalid parse.row_selector {}: {err:?}",
                self.parse.row_selector
            )
        })?;

        Ok(())
    }

    /// Applies environment-style overrides. `lookup` returns the raw value
    /// for a variable name, if set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "BASE_PRICE_DAY", &mut self.pricing.day_price)?;
        override_parsed(&lookup, "BASE_PRICE_NIGHT", &mut self.pricing.night_price)?;
        override_parsed(
            &lookup,
            "NIGHT_START_HOUR",
            &mut self.pricing.night_start_hour,
        )?;
        override_parsed(&lookup, "START_HOUR", &mut self.venue.opening_hour)?;
        override_parsed(&lookup, "END_HOUR", &mut self.venue.closing_hour)?;
        override_parsed(&lookup, "TOTAL_COURTS", &mut self.venue.total_courts)?;
        override_parsed(&lookup, "SPORT_ID", &mut self.venue.sport_id)?;
        override_parsed(&lookup, "FETCH_MODE", &mut self.fetch.mode)?;
        override_parsed(&lookup, "FETCH_TIMEOUT_SECS", &mut self.fetch.timeout_secs)?;

        if let Some(url) = lookup("ACADEMY_URL") {
            self.venue.base_url = url;
        }
        if let Some(timezone) = lookup("VENUE_TIMEZONE") {
            self.venue.timezone = Some(timezone);
        }
        if let Some(path) = lookup("FETCH_FILE") {
            self.fetch.file_path = Some(PathBuf::from(path));
        }
        if let Some(user_agent) = lookup("USER_AGENT") {
            self.fetch.user_agent = Some(user_agent);
        }
        if let Some(selector) = lookup("ROW_SELECTOR") {
            self.parse.row_selector = selector;
        }
        if let Some(path) = lookup("SNAPSHOT_PATH") {
            self.storage.snapshot_path = Some(PathBuf::from(path));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_day_price")]
    pub day_price: f64,
    #[serde(default = "default_night_price")]
    pub night_price: f64,
    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            day_price: default_day_price(),
            night_price: default_night_price(),
            night_start_hour: default_night_start_hour(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    #[serde(default = "default_venue_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_sport_id")]
    pub sport_id: u32,
    #[serde(default = "default_total_courts")]
    pub total_courts: usize,
    #[serde(default = "default_opening_hour")]
    pub opening_hour: u32,
    #[serde(default = "default_closing_hour")]
    pub closing_hour: u32,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: default_venue_name(),
            base_url: default_base_url(),
            sport_id: default_sport_id(),
            total_courts: default_total_courts(),
            opening_hour: default_opening_hour(),
            closing_hour: default_closing_hour(),
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Http,
    File,
    Disabled,
}

impl FromStr for FetchMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(FetchMode::Http),
            "file" => Ok(FetchMode::File),
            "disabled" | "none" => Ok(FetchMode::Disabled),
            other => bail!("unknown fetch mode {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            file_path: None,
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            row_selector: default_row_selector(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Defaults, then the optional TOML file, then process environment.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match config_path {
        Some(path) => load_config_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn load_config_file(config_path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config: {}", config_path.display()))?;
    let config: AppConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    Ok(config)
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *target = raw
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid value for {key} ({raw}): {err}"))?;
    Ok(())
}

fn default_day_price() -> f64 {
    80.0
}

fn default_night_price() -> f64 {
    104.0
}

fn default_night_start_hour() -> u32 {
    18
}

fn default_venue_name() -> String {
    "Villa Park Beach".to_string()
}

fn default_base_url() -> String {
    "https://letzplay.me/villa-parkbeach/location".to_string()
}

fn default_sport_id() -> u32 {
    2
}

fn default_total_courts() -> usize {
    8
}

fn default_opening_hour() -> u32 {
    7
}

fn default_closing_hour() -> u32 {
    22
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_row_selector() -> String {
    "div.row.striped-line".to_string()
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("data/state/court_snapshot.json"))
}
