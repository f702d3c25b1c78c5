//! Konfigurace z env proměnných (po `dotenv().ok()` v binárce).

use crate::error::ConfigError;
use crate::pacing::Pacing;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const TARGET_URL: &str = "https://www.oddsportal.com/value-bets/";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const VIEWPORT: (u32, u32) = (1920, 1080);
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
/// Substring, který musí validní markup obsahovat (case-insensitive)
pub const MARKUP_ANCHOR: &str = "value-bets";
pub const MIN_MARKUP_LEN: usize = 5000;
pub const FILTER_TEXT: &str = "All sports";
/// Horní mez pro počty pokusů; víc nemá při backoffu 5-15 s smysl
pub const MAX_ATTEMPTS_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub target_url: String,
    pub max_attempts: u32,
    pub nav_attempts: u32,
    pub export_path: PathBuf,
    pub log_dir: PathBuf,
    pub run_timeout: Duration,
    pub high_probability: f64,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub ntfy_topic: Option<String>,
    pub pacing: Pacing,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: TARGET_URL.to_string(),
            max_attempts: 3,
            nav_attempts: 3,
            export_path: PathBuf::from("data/data.csv"),
            log_dir: PathBuf::from("logs"),
            run_timeout: Duration::from_secs(900),
            high_probability: 50.0,
            chrome_path: None,
            headless: true,
            ntfy_topic: None,
            pacing: Pacing::default(),
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Stejné jako `from_env`, ale s vlastním zdrojem hodnot
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cfg = Self {
            target_url: get("VALUEBETS_URL").unwrap_or(defaults.target_url),
            max_attempts: parse_or(get("VALUEBETS_MAX_ATTEMPTS"), "VALUEBETS_MAX_ATTEMPTS", defaults.max_attempts)?,
            nav_attempts: parse_or(get("VALUEBETS_NAV_ATTEMPTS"), "VALUEBETS_NAV_ATTEMPTS", defaults.nav_attempts)?,
            export_path: get("VALUEBETS_EXPORT_PATH").map(PathBuf::from).unwrap_or(defaults.export_path),
            log_dir: get("VALUEBETS_LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            run_timeout: Duration::from_secs(parse_or(
                get("VALUEBETS_RUN_TIMEOUT_SECS"),
                "VALUEBETS_RUN_TIMEOUT_SECS",
                defaults.run_timeout.as_secs(),
            )?),
            high_probability: parse_or(get("VALUEBETS_HIGH_PROB"), "VALUEBETS_HIGH_PROB", defaults.high_probability)?,
            chrome_path: get("VALUEBETS_CHROME_PATH").map(PathBuf::from),
            headless: parse_or(get("VALUEBETS_HEADLESS"), "VALUEBETS_HEADLESS", defaults.headless)?,
            ntfy_topic: get("NTFY_TOPIC"),
            pacing: defaults.pacing,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("VALUEBETS_MAX_ATTEMPTS", "0", "must be at least 1"));
        }
        if self.nav_attempts == 0 {
            return Err(invalid("VALUEBETS_NAV_ATTEMPTS", "0", "must be at least 1"));
        }
        for (key, value) in [
            ("VALUEBETS_MAX_ATTEMPTS", self.max_attempts),
            ("VALUEBETS_NAV_ATTEMPTS", self.nav_attempts),
        ] {
            if value > MAX_ATTEMPTS_LIMIT {
                return Err(invalid(
                    key,
                    &value.to_string(),
                    &format!("must be at most {MAX_ATTEMPTS_LIMIT}"),
                ));
            }
        }
        if !self.high_probability.is_finite() {
            return Err(invalid(
                "VALUEBETS_HIGH_PROB",
                &self.high_probability.to_string(),
                "must be a finite number",
            ));
        }
        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(invalid("VALUEBETS_URL", &self.target_url, "must be an http(s) URL"));
        }
        Ok(())
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|e| invalid(key, &v, &e.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
