//! Environment driven configuration.
//!
//! Every setting has a default, so the pipeline runs against the public
//! source site with no `.env` file at all. Values are read through a lookup
//! closure so parsing can be tested without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::parser::MalformedPolicy;

pub const DEFAULT_BASE_URL: &str = "https://web-scraping.dev";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Origin of the listing site, without a trailing slash
    pub base_url: String,
    /// Directory holding the persisted tables
    pub output_dir: PathBuf,
    /// Page count walked for the product listing
    pub product_pages: u32,
    /// Upper bound on pages for open-ended listings
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Pause between consecutive page requests of one listing
    pub page_delay: Duration,
    pub malformed: MalformedPolicy,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("./data"),
            product_pages: 5,
            max_pages: 50,
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_delay: Duration::from_millis(500),
            malformed: MalformedPolicy::Skip,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a value that cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a value that cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let defaults = Self::default();

        let or_default = |var: &str, default: &str| -> String {
            lookup(var).unwrap_or_else(|_| default.to_string())
        };

        let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
            lookup(var).map_or(Ok(default), |raw| {
                raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
            })
        };

        let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
            lookup(var).map_or(Ok(default), |raw| {
                raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
            })
        };

        let base_url = or_default("BRAND_PULSE_BASE_URL", &defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidEnvVar {
                var: "BRAND_PULSE_BASE_URL".to_string(),
                reason: format!("expected an http(s) URL, got {base_url:?}"),
            });
        }

        let output_dir = lookup("BRAND_PULSE_OUTPUT_DIR").map_or(defaults.output_dir, PathBuf::from);

        let product_pages = parse_u32("BRAND_PULSE_PRODUCT_PAGES", defaults.product_pages)?;
        let max_pages = parse_u32("BRAND_PULSE_MAX_PAGES", defaults.max_pages)?;
        if max_pages == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: "BRAND_PULSE_MAX_PAGES".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs = parse_u64("BRAND_PULSE_REQUEST_TIMEOUT_SECS", 30)?;
        let delay_ms = parse_u64("BRAND_PULSE_PAGE_DELAY_MS", 500)?;

        let malformed = match lookup("BRAND_PULSE_MALFORMED") {
            Ok(raw) => raw
                .parse::<MalformedPolicy>()
                .map_err(|reason| ConfigError::InvalidEnvVar {
                    var: "BRAND_PULSE_MALFORMED".to_string(),
                    reason,
                })?,
            Err(_) => defaults.malformed,
        };

        Ok(Self {
            base_url,
            output_dir,
            product_pages,
            max_pages,
            request_timeout: Duration::from_secs(timeout_secs),
            user_agent: or_default("BRAND_PULSE_USER_AGENT", &defaults.user_agent),
            page_delay: Duration::from_millis(delay_ms),
            malformed,
            log_level: or_default("BRAND_PULSE_LOG_LEVEL", &defaults.log_level),
        })
    }
}
