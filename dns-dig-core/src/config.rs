//! Endpoint and transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DigError, DigResult};
use crate::types::DohProvider;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration.
///
/// Every field has a default, so a host can deserialize a partial JSON document
/// and only override what it needs:
///
/// ```rust
/// use dns_dig_core::DigConfig;
///
/// let config = DigConfig::from_json(r#"{ "rdapBaseUrl": "https://rdap.example" }"#).unwrap();
/// assert_eq!(config.rdap_base_url, "https://rdap.example");
/// assert_eq!(config.timeout_secs, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DigConfig {
    /// Cloudflare DoH JSON endpoint.
    pub cloudflare_endpoint: String,
    /// Google DoH JSON endpoint.
    pub google_endpoint: String,
    /// Quad9 DoH JSON endpoint.
    pub quad9_endpoint: String,
    /// `AdGuard` DoH JSON endpoint.
    pub adguard_endpoint: String,
    /// RDAP aggregator; `/domain/<name>` is appended.
    pub rdap_base_url: String,
    /// Registry WHOIS web form for the `.ru`/`.su`/`.рф` family.
    /// `{domain}` is replaced with the URL-encoded Unicode domain.
    pub registry_whois_url: String,
    /// `RIPEstat` data API base (IP owner lookups).
    pub ripe_stat_base_url: String,
    /// ipapi.co base (IP owner fallback).
    pub ipapi_base_url: String,
    /// Per-request timeout; `None` waits forever.
    pub timeout_secs: Option<u64>,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for DigConfig {
    fn default() -> Self {
        Self {
            cloudflare_endpoint: DohProvider::Cloudflare.default_endpoint().to_string(),
            google_endpoint: DohProvider::Google.default_endpoint().to_string(),
            quad9_endpoint: DohProvider::Quad9.default_endpoint().to_string(),
            adguard_endpoint: DohProvider::AdGuard.default_endpoint().to_string(),
            rdap_base_url: "https://rdap.org".to_string(),
            registry_whois_url: "https://www.nic.ru/whois/?searchWord={domain}".to_string(),
            ripe_stat_base_url: "https://stat.ripe.net/data".to_string(),
            ipapi_base_url: "https://ipapi.co".to_string(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("dns-dig/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl DigConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> DigResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DigError::ValidationError(format!("Invalid configuration: {e}")))
    }

    /// Endpoint URL for a provider.
    pub fn endpoint(&self, provider: DohProvider) -> &str {
        match provider {
            DohProvider::Cloudflare => &self.cloudflare_endpoint,
            DohProvider::Google => &self.google_endpoint,
            DohProvider::Quad9 => &self.quad9_endpoint,
            DohProvider::AdGuard => &self.adguard_endpoint,
        }
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Registry WHOIS URL for a domain.
    pub fn registry_url_for(&self, unicode_domain: &str) -> String {
        self.registry_whois_url
            .replace("{domain}", &urlencoding::encode(unicode_domain))
    }
}
