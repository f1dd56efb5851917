//! Default country for the registration form, guessed from the visitor's IP.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::GeoConfig;
use crate::error::{SiteError, SiteResult};

#[derive(Debug, Deserialize)]
struct GeoResponse {
    country_name: Option<String>,
}

pub struct CountryDetector {
    http: reqwest::Client,
    endpoint: String,
    fallback: String,
    timeout: Duration,
    detected: Mutex<Option<String>>,
}

impl CountryDetector {
    pub fn new(config: &GeoConfig) -> SiteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| SiteError::ConfigError(format!("geo client: {err}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            fallback: config.fallback_country.clone(),
            timeout: config.timeout(),
            detected: Mutex::new(None),
        })
    }

    /// Pick the visitor's country if it is one of `options`, else the
    /// fallback if offered. The lookup runs at most once per session.
    pub async fn default_country(&self, options: &[&str]) -> Option<String> {
        let detected = self.detect().await;
        let offered = |name: &str| options.iter().any(|opt| *opt == name);

        match detected {
            Some(country) if offered(country.as_str()) => Some(country),
            _ if offered(self.fallback.as_str()) => Some(self.fallback.clone()),
            _ => None,
        }
    }

    /// Country name reported by the lookup service, falling back on failure.
    pub async fn detect(&self) -> Option<String> {
        let mut cached = self.detected.lock().await;
        if let Some(country) = cached.as_ref() {
            return Some(country.clone());
        }

        match self.lookup().await {
            Ok(country) => {
                debug!(%country, "visitor country detected");
                *cached = Some(country.clone());
                Some(country)
            }
            Err(err) => {
                warn!("country detection failed: {err}");
                *cached = Some(self.fallback.clone());
                Some(self.fallback.clone())
            }
        }
    }

    async fn lookup(&self) -> SiteResult<String> {
        let resp = self
            .http
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| SiteError::Internal(format!("geo lookup: {err}")))?;

        if !resp.status().is_success() {
            return Err(SiteError::Internal(format!(
                "geo lookup: HTTP {}",
                resp.status().as_u16()
            )));
        }

        let body: GeoResponse = resp
            .json()
            .await
            .map_err(|err| SiteError::Internal(format!("geo lookup body: {err}")))?;
        Ok(body
            .country_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
