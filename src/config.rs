use crate::error::{SiteError, SiteResult};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub api: ApiConfig,
    pub payments: PaymentsConfig,
    pub forms: FormsConfig,
    pub geo: GeoConfig,
    pub blog: BlogConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin the success page is served from, e.g. `https://example.org`.
    pub origin: String,
    /// Path of the donation success page relative to the origin.
    pub success_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            success_path: "success.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 8_000,
            max_retries: 2,
            retry_delay_ms: 1_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Publishable key handed to the hosted card widget. Required for donations.
    pub publishable_key: Option<String>,
    pub api_version: String,
    pub currency: String,
    pub debounce_ms: u64,
    /// Ceiling in major currency units.
    pub max_amount: f64,
    pub max_name_length: usize,
    pub notification_timeout_ms: u64,
    pub redirect_delay_ms: u64,
    /// Element id the card input is mounted into.
    pub card_container: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            publishable_key: None,
            api_version: "2023-10-16".to_string(),
            currency: "usd".to_string(),
            debounce_ms: 500,
            max_amount: 10_000.0,
            max_name_length: 255,
            notification_timeout_ms: 5_000,
            redirect_delay_ms: 1_500,
            card_container: "stripe-card-element".to_string(),
        }
    }
}

impl PaymentsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Minimum spacing between two contact form submissions.
    pub contact_debounce_ms: u64,
    pub registration_reset_delay_ms: u64,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            contact_debounce_ms: 2_000,
            registration_reset_delay_ms: 1_500,
        }
    }
}

impl FormsConfig {
    pub fn contact_debounce(&self) -> Duration {
        Duration::from_millis(self.contact_debounce_ms)
    }

    pub fn registration_reset_delay(&self) -> Duration {
        Duration::from_millis(self.registration_reset_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub endpoint: String,
    pub fallback_country: String,
    pub timeout_ms: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipapi.co/json/".to_string(),
            fallback_country: "United States".to_string(),
            timeout_ms: 3_000,
        }
    }
}

impl GeoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    /// JSON list of posts shown when the backend cannot be reached.
    pub local_data_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Channel listing is only queried when both key and channel are set.
    pub youtube_api_key: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub youtube_endpoint: String,
    pub youtube_max_results: u32,
    /// Defaults to `<cache dir>/haile/media`.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            youtube_channel_id: None,
            youtube_endpoint: "https://www.googleapis.com/youtube/v3/search".to_string(),
            youtube_max_results: 4,
            cache_dir: None,
            cache_ttl_secs: 3_600,
            timeout_ms: 8_000,
        }
    }
}

impl MediaConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub fn load_config(path: Option<&Path>) -> SiteResult<AppConfig> {
    let mut builder = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::with_prefix("HAILE").separator("__"));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(false));
    }

    let config = builder
        .build()
        .map_err(|err| SiteError::ConfigError(err.to_string()))?;

    let parsed: AppConfig = config
        .try_deserialize()
        .map_err(|err| SiteError::ConfigError(err.to_string()))?;

    if parsed.api.base_url.trim().is_empty() {
        return Err(SiteError::ConfigError(
            "api.base_url must not be empty".to_string(),
        ));
    }

    if !(parsed.payments.max_amount > 0.0) {
        return Err(SiteError::ConfigError(format!(
            "payments.max_amount must be positive, got {}",
            parsed.payments.max_amount
        )));
    }

    Ok(parsed)
}
