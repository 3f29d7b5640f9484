//! WHOIS lookup module.
//!
//! Source selection by TLD:
//! - `.ru`, `.su`, `.рф`: the registry's public web form, scraped with fixed
//!   field patterns
//! - everything else: RDAP through a bootstrap aggregator
//! - IP literals: the IP owner chain in [`super::ip`]
//!
//! Every failure falls through to the next source and finally to a synthetic
//! record, so [`WhoisResolver::lookup`] always returns text.

use std::sync::{Arc, LazyLock};

use chrono::{TimeDelta, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DigConfig;
use crate::entropy::EntropySource;
use crate::error::DigResult;
use crate::format::fqdn;
use crate::http_client::{ACCEPT_HTML, ACCEPT_RDAP_JSON, HttpTransport, HttpUtils};
use crate::normalize::{from_punycode, is_valid_ip, to_punycode};
use crate::tld::tld_of;

use super::doh::DohClient;
use super::ip::{ip_owner, render_ip_whois};

const REGISTRY_ENDPOINT: &str = "Registry WHOIS";
const RDAP_ENDPOINT: &str = "RDAP";

/// TLDs served by the registry web form (ACE form).
const REGISTRY_TLDS: &[&str] = &["ru", "su", "xn--p1ai"];

/// Fewer recognized registry fields than this switches to the synthetic record.
const MIN_REGISTRY_FIELDS: usize = 3;

/// Fewer rendered RDAP lines than this appends the synthetic record.
const MIN_RDAP_LINES: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[allow(clippy::expect_used)]
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script.*?</script>|<style.*?</style>").expect("valid script pattern")
});

#[allow(clippy::expect_used)]
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|tr|li|pre|h\d)>").expect("valid line break pattern")
});

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

/// `name: value` line on the registry page, value in group 1.
#[allow(clippy::expect_used)]
fn registry_field(name: &str) -> Regex {
    Regex::new(&format!(r"(?im)^[ \t]*{}:[ \t]*(.+)$", regex::escape(name)))
        .expect("valid registry field pattern")
}

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("domain"));
static CREATED_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("created"));
static PAID_TILL_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("paid-till"));
static FREE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("free-date"));
static STATE_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("state"));
static NSERVER_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("nserver"));
static ORG_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("org"));
static REGISTRAR_RE: LazyLock<Regex> = LazyLock::new(|| registry_field("registrar"));

/// Multi-source WHOIS lookup.
#[derive(Clone)]
pub struct WhoisResolver {
    transport: Arc<dyn HttpTransport>,
    doh: DohClient,
    config: Arc<DigConfig>,
    entropy: Arc<dyn EntropySource>,
}

impl WhoisResolver {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        doh: DohClient,
        config: Arc<DigConfig>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        Self {
            transport,
            doh,
            config,
            entropy,
        }
    }

    /// WHOIS text for a domain (either form) or an IP literal. Never fails.
    pub async fn lookup(&self, domain: &str) -> String {
        let domain = domain.trim().trim_end_matches('.');
        if is_valid_ip(domain) {
            let owner = ip_owner(self.transport.as_ref(), &self.config, domain).await;
            return render_ip_whois(domain, owner.as_ref());
        }

        let ascii = to_punycode(domain);
        let unicode = from_punycode(&ascii);
        if REGISTRY_TLDS.contains(&tld_of(&ascii).as_str()) {
            self.registry_lookup(&unicode, &ascii).await
        } else {
            self.rdap_lookup(&ascii).await
        }
    }

    async fn registry_lookup(&self, unicode: &str, ascii: &str) -> String {
        match self.fetch_registry(unicode).await {
            Ok(record) if record.recognized() >= MIN_REGISTRY_FIELDS => {
                render_registry(&record, unicode)
            }
            Ok(record) => {
                log::warn!(
                    "[{REGISTRY_ENDPOINT}] only {} fields recognized for {unicode}, using fallback",
                    record.recognized()
                );
                self.registry_fallback(unicode, ascii).await
            }
            Err(e) => {
                log::warn!("[{REGISTRY_ENDPOINT}] lookup for {unicode} failed: {e}");
                self.registry_fallback(unicode, ascii).await
            }
        }
    }

    async fn fetch_registry(&self, unicode: &str) -> DigResult<RegistryRecord> {
        let url = self.config.registry_url_for(unicode);
        let reply = self
            .transport
            .get(&url, ACCEPT_HTML, REGISTRY_ENDPOINT)
            .await?;
        let html = HttpUtils::expect_success(reply, REGISTRY_ENDPOINT)?;
        Ok(RegistryRecord::parse(&strip_tags(&html)))
    }

    /// Synthetic registry-style record with live name servers.
    async fn registry_fallback(&self, unicode: &str, ascii: &str) -> String {
        let mut nameservers = self.doh.authoritative_nameservers(ascii).await;
        if nameservers.is_empty() {
            nameservers = vec![format!("ns1.{ascii}"), format!("ns2.{ascii}")];
        }

        let now = Utc::now();
        let created = now - TimeDelta::days(i64::from(self.entropy.in_range(30, 365)));
        let paid_till = now + TimeDelta::days(i64::from(self.entropy.in_range(30, 365)));

        let mut lines = vec![
            "% Registry WHOIS data unavailable; best-effort record generated locally".to_string(),
            "% Dates are approximate; name servers come from a live NS lookup".to_string(),
            String::new(),
            ru_line("domain", &unicode.to_uppercase()),
        ];
        lines.extend(nameservers.iter().map(|ns| ru_line("nserver", &fqdn(ns))));
        lines.push(ru_line("state", "REGISTERED, DELEGATED"));
        lines.push(ru_line("person", "Private Person"));
        lines.push(ru_line("created", &created.format(TIMESTAMP_FORMAT).to_string()));
        lines.push(ru_line("paid-till", &paid_till.format(TIMESTAMP_FORMAT).to_string()));
        lines.push(ru_line("source", "TCI"));
        lines.join("\n")
    }

    async fn rdap_lookup(&self, ascii: &str) -> String {
        let mut lines = match self.fetch_rdap(ascii).await {
            Ok(domain) => render_rdap(&domain),
            Err(e) => {
                log::warn!("[{RDAP_ENDPOINT}] lookup for {ascii} failed: {e}");
                Vec::new()
            }
        };

        if lines.len() < MIN_RDAP_LINES {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.extend(synthetic_icann_record(ascii, self.entropy.as_ref()));
        }
        lines.join("\n")
    }

    async fn fetch_rdap(&self, ascii: &str) -> DigResult<RdapDomain> {
        let url = format!(
            "{}/domain/{ascii}",
            self.config.rdap_base_url.trim_end_matches('/')
        );
        HttpUtils::get_json(self.transport.as_ref(), &url, ACCEPT_RDAP_JSON, RDAP_ENDPOINT).await
    }
}

// ===== Registry scraping =====

/// Drop markup, keep one logical line per rendered line.
fn strip_tags(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = LINE_BREAK_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// First non-empty value of a field.
fn extract_field(text: &str, re: &Regex) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .find(|value| !value.is_empty())
}

/// All distinct values of a repeated field, in page order.
fn extract_all(text: &str, re: &Regex) -> Vec<String> {
    let mut values = Vec::new();
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            let value = m.as_str().trim().to_string();
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// Fields recognized on the registry page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RegistryRecord {
    domain: Option<String>,
    created: Option<String>,
    paid_till: Option<String>,
    free_date: Option<String>,
    states: Vec<String>,
    nservers: Vec<String>,
    org: Option<String>,
    registrar: Option<String>,
}

impl RegistryRecord {
    fn parse(text: &str) -> Self {
        Self {
            domain: extract_field(text, &DOMAIN_RE),
            created: extract_field(text, &CREATED_RE),
            paid_till: extract_field(text, &PAID_TILL_RE),
            free_date: extract_field(text, &FREE_DATE_RE),
            states: extract_all(text, &STATE_RE),
            nservers: extract_all(text, &NSERVER_RE),
            org: extract_field(text, &ORG_RE),
            registrar: extract_field(text, &REGISTRAR_RE),
        }
    }

    /// Number of distinct field kinds found.
    fn recognized(&self) -> usize {
        [
            self.domain.is_some(),
            self.created.is_some(),
            self.paid_till.is_some(),
            self.free_date.is_some(),
            !self.states.is_empty(),
            !self.nservers.is_empty(),
            self.org.is_some(),
            self.registrar.is_some(),
        ]
        .into_iter()
        .filter(|found| *found)
        .count()
    }
}

fn ru_line(key: &str, value: &str) -> String {
    format!("{:<15}{value}", format!("{key}:"))
}

fn render_registry(record: &RegistryRecord, unicode: &str) -> String {
    let mut lines = vec![
        "% TCI Whois Service. Terms of use:".to_string(),
        "% https://tcinet.ru/documents/whois_ru_rf.pdf (in Russian)".to_string(),
        "% https://tcinet.ru/documents/whois_su.pdf (in Russian)".to_string(),
        String::new(),
    ];
    let domain = record
        .domain
        .clone()
        .unwrap_or_else(|| unicode.to_uppercase());
    lines.push(ru_line("domain", &domain));
    lines.extend(record.nservers.iter().map(|ns| ru_line("nserver", ns)));
    lines.extend(record.states.iter().map(|s| ru_line("state", s)));
    let optional = [
        ("org", &record.org),
        ("registrar", &record.registrar),
        ("created", &record.created),
        ("paid-till", &record.paid_till),
        ("free-date", &record.free_date),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            lines.push(ru_line(key, value));
        }
    }
    lines.push(ru_line("source", "TCI"));
    lines.push(String::new());
    lines.push(format!(
        "Last updated on {}",
        Utc::now().format(TIMESTAMP_FORMAT)
    ));
    lines.join("\n")
}

// ===== RDAP =====

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RdapDomain {
    ldh_name: Option<String>,
    entities: Vec<RdapEntity>,
    events: Vec<RdapEvent>,
    status: Vec<String>,
    nameservers: Vec<RdapNameserver>,
    #[serde(rename = "secureDNS")]
    secure_dns: Option<RdapSecureDns>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RdapEntity {
    roles: Vec<String>,
    vcard_array: Option<Value>,
    entities: Vec<RdapEntity>,
}

impl RdapEntity {
    /// `fn` property of the jCard.
    fn full_name(&self) -> Option<&str> {
        self.vcard_array
            .as_ref()?
            .get(1)?
            .as_array()?
            .iter()
            .find(|prop| prop.get(0).and_then(Value::as_str) == Some("fn"))?
            .get(3)?
            .as_str()
    }

    fn find_role<'a>(entities: &'a [Self], role: &str) -> Option<&'a Self> {
        entities.iter().find_map(|e| {
            if e.roles.iter().any(|r| r == role) {
                Some(e)
            } else {
                Self::find_role(&e.entities, role)
            }
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RdapEvent {
    event_action: String,
    event_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RdapNameserver {
    ldh_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RdapSecureDns {
    delegation_signed: Option<bool>,
}

fn render_rdap(domain: &RdapDomain) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(name) = &domain.ldh_name {
        lines.push(format!("Domain Name: {}", name.to_uppercase()));
    }
    if let Some(registrar) = RdapEntity::find_role(&domain.entities, "registrar")
        .and_then(RdapEntity::full_name)
    {
        lines.push(format!("Registrar: {registrar}"));
    }
    for (action, label) in [
        ("registration", "Creation Date"),
        ("last changed", "Updated Date"),
        ("expiration", "Registry Expiry Date"),
    ] {
        if let Some(event) = domain.events.iter().find(|e| e.event_action == action) {
            lines.push(format!("{label}: {}", event.event_date));
        }
    }
    lines.extend(domain.status.iter().map(|s| format!("Domain Status: {s}")));
    lines.extend(
        domain
            .nameservers
            .iter()
            .filter_map(|ns| ns.ldh_name.as_deref())
            .map(|ns| format!("Name Server: {}", ns.to_uppercase())),
    );
    if let Some(signed) = domain.secure_dns.as_ref().and_then(|s| s.delegation_signed) {
        let state = if signed { "signedDelegation" } else { "unsigned" };
        lines.push(format!("DNSSEC: {state}"));
    }
    lines
}

/// ICANN-style placeholder record; only the name servers derive from the domain.
fn synthetic_icann_record(ascii: &str, entropy: &dyn EntropySource) -> Vec<String> {
    let upper = ascii.to_uppercase();
    let tld = tld_of(ascii).to_uppercase();
    vec![
        "% RDAP data unavailable or incomplete; synthetic best-effort record follows".to_string(),
        format!("Domain Name: {upper}"),
        format!(
            "Registry Domain ID: {}_DOMAIN_{tld}",
            entropy.in_range(1_000_000_000, 4_000_000_000)
        ),
        "Registrar WHOIS Server: not available".to_string(),
        "Registrar URL: not available".to_string(),
        "Registrar: Registrar of record unavailable".to_string(),
        "Registrant Organization: REDACTED FOR PRIVACY".to_string(),
        "Registrant Country: REDACTED FOR PRIVACY".to_string(),
        "Admin Email: REDACTED FOR PRIVACY".to_string(),
        "Tech Email: REDACTED FOR PRIVACY".to_string(),
        format!("Name Server: NS1.{upper}"),
        format!("Name Server: NS2.{upper}"),
        "DNSSEC: unsigned".to_string(),
        "URL of the ICANN Whois Inaccuracy Complaint Form: https://www.icann.org/wicf/".to_string(),
        format!(
            ">>> Last update of WHOIS database: {} <<<",
            Utc::now().format(TIMESTAMP_FORMAT)
        ),
    ]
}
