//! IP owner lookup.
//!
//! RIPEstat first (`addr-lookup`, then the `inetnum`/`inet6num` object),
//! ipapi.co second. Both are best-effort: any failure just moves on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DigConfig;
use crate::error::DigResult;
use crate::http_client::{ACCEPT_JSON, HttpTransport, HttpUtils};

const RIPE_ENDPOINT: &str = "RIPEstat";
const IPAPI_ENDPOINT: &str = "ipapi.co";

/// Longest organization name shown before it is shortened.
const MAX_ORGANIZATION_LEN: usize = 100;

static NULL: Value = Value::Null;

/// Placeholder when no source names the owner.
pub const UNKNOWN_ORGANIZATION: &str = "Unknown";

/// Where an [`IpOwner`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpOwnerSource {
    Ripe,
    IpApi,
}

impl IpOwnerSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ripe => "RIPE",
            Self::IpApi => IPAPI_ENDPOINT,
        }
    }
}

/// Owner of an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpOwner {
    pub ip: String,
    pub organization: String,
    /// Origin AS, always `AS`-prefixed.
    pub asn: Option<String>,
    /// ISO country code, uppercase.
    pub country: Option<String>,
    pub source: IpOwnerSource,
}

/// Look up the owner of `ip`; `None` when every source fails.
pub async fn ip_owner(
    transport: &dyn HttpTransport,
    config: &DigConfig,
    ip: &str,
) -> Option<IpOwner> {
    match from_ripe(transport, config, ip).await {
        Ok(Some(owner)) => return Some(owner),
        Ok(None) => log::debug!("[{RIPE_ENDPOINT}] no inetnum object for {ip}"),
        Err(e) => log::warn!("[{RIPE_ENDPOINT}] lookup for {ip} failed: {e}"),
    }

    match from_ipapi(transport, config, ip).await {
        Ok(owner) => owner,
        Err(e) => {
            log::warn!("[{IPAPI_ENDPOINT}] lookup for {ip} failed: {e}");
            None
        }
    }
}

/// First string of a value that is either a string or an array of strings.
fn first_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

fn with_as_prefix(asn: &str) -> String {
    if asn.to_ascii_uppercase().starts_with("AS") {
        asn.to_string()
    } else {
        format!("AS{asn}")
    }
}

async fn from_ripe(
    transport: &dyn HttpTransport,
    config: &DigConfig,
    ip: &str,
) -> DigResult<Option<IpOwner>> {
    let base = config.ripe_stat_base_url.trim_end_matches('/');
    let lookup_url = format!("{base}/addr-lookup.json?resource={ip}");
    let lookup: Value =
        HttpUtils::get_json(transport, &lookup_url, ACCEPT_JSON, RIPE_ENDPOINT).await?;

    let handle = lookup["data"]["resources"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|r| matches!(r["type"].as_str(), Some("inetnum" | "inet6num")))
        .and_then(|r| r["handle"].as_str().or_else(|| r["key"].as_str()));
    let Some(handle) = handle else {
        return Ok(None);
    };

    let object_url = format!("{base}/object.json?identifier={}", urlencoding::encode(handle));
    let object: Value =
        HttpUtils::get_json(transport, &object_url, ACCEPT_JSON, RIPE_ENDPOINT).await?;
    let record = &object["data"]["record"];
    if record.is_null() {
        return Ok(None);
    }

    let section = match &record["section"] {
        Value::Array(sections) => sections.first().unwrap_or(&NULL),
        other => other,
    };
    let objects = section["objects"].as_array().map(Vec::as_slice).unwrap_or_default();
    let field = |name: &str| {
        objects
            .iter()
            .find(|o| o["name"].as_str() == Some(name))
            .and_then(|o| first_str(&o["value"]))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let organization = field("descr")
        .or_else(|| field("netname"))
        .unwrap_or(UNKNOWN_ORGANIZATION)
        .to_string();

    Ok(Some(IpOwner {
        ip: ip.to_string(),
        organization,
        asn: field("origin").map(with_as_prefix),
        country: field("country").map(str::to_uppercase),
        source: IpOwnerSource::Ripe,
    }))
}

async fn from_ipapi(
    transport: &dyn HttpTransport,
    config: &DigConfig,
    ip: &str,
) -> DigResult<Option<IpOwner>> {
    let url = format!("{}/{ip}/json/", config.ipapi_base_url.trim_end_matches('/'));
    let data: Value = HttpUtils::get_json(transport, &url, ACCEPT_JSON, IPAPI_ENDPOINT).await?;
    if data["error"].as_bool() == Some(true) || data["ip"].is_null() {
        return Ok(None);
    }

    let organization = ["org", "company_name", "isp"]
        .iter()
        .find_map(|key| data[*key].as_str().filter(|s| !s.trim().is_empty()))
        .unwrap_or(UNKNOWN_ORGANIZATION)
        .to_string();
    let asn = match &data["asn"] {
        Value::String(s) if !s.is_empty() => Some(with_as_prefix(s)),
        Value::Number(n) => Some(format!("AS{n}")),
        _ => None,
    };

    Ok(Some(IpOwner {
        ip: data["ip"].as_str().unwrap_or(ip).to_string(),
        organization,
        asn,
        country: data["country_code"].as_str().map(str::to_string),
        source: IpOwnerSource::IpApi,
    }))
}

/// Trim an organization name and shorten it to 97 chars plus `...` when
/// longer than 100.
pub fn format_organization_name(org: &str) -> String {
    let trimmed = org.trim();
    if trimmed.is_empty() {
        return UNKNOWN_ORGANIZATION.to_string();
    }
    if trimmed.chars().count() > MAX_ORGANIZATION_LEN {
        let head: String = trimmed.chars().take(MAX_ORGANIZATION_LEN - 3).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// WHOIS-style text for an IP address.
pub fn render_ip_whois(ip: &str, owner: Option<&IpOwner>) -> String {
    let Some(owner) = owner else {
        return format!("% No WHOIS data available for {ip}");
    };
    let mut lines = vec![
        "% IP address owner information".to_string(),
        String::new(),
        format!("{:<14}{}", "ip:", owner.ip),
        format!("{:<14}{}", "organization:", format_organization_name(&owner.organization)),
    ];
    if let Some(asn) = &owner.asn {
        lines.push(format!("{:<14}{asn}", "origin:"));
    }
    if let Some(country) = &owner.country {
        lines.push(format!("{:<14}{country}", "country:"));
    }
    lines.push(format!("{:<14}{}", "source:", owner.source.label()));
    lines.join("\n")
}
