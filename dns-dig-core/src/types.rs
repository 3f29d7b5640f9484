//! Public types returned by query operations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire code used when a type name is not in the registry.
pub const ANY_TYPE_CODE: u16 = 255;

/// DNS record type from the IANA registry.
///
/// Codes without a named variant are kept as [`Other`](Self::Other) and
/// render as `TYPE<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// Name server record.
    Ns,
    /// Canonical name (alias) record.
    Cname,
    /// Start of authority record.
    Soa,
    /// Pointer record (reverse DNS).
    Ptr,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// IPv6 address record.
    Aaaa,
    /// Service locator record.
    Srv,
    /// Delegation signer.
    Ds,
    /// DNSSEC signature.
    Rrsig,
    /// Next secure record.
    Nsec,
    /// DNSSEC public key.
    Dnskey,
    /// Service binding.
    Svcb,
    /// HTTPS service binding.
    Https,
    /// Any-type query.
    Any,
    /// Certificate Authority Authorization record.
    Caa,
    /// Code with no named variant.
    Other(u16),
}

const REGISTRY: &[(RecordType, &str, u16)] = &[
    (RecordType::A, "A", 1),
    (RecordType::Ns, "NS", 2),
    (RecordType::Cname, "CNAME", 5),
    (RecordType::Soa, "SOA", 6),
    (RecordType::Ptr, "PTR", 12),
    (RecordType::Mx, "MX", 15),
    (RecordType::Txt, "TXT", 16),
    (RecordType::Aaaa, "AAAA", 28),
    (RecordType::Srv, "SRV", 33),
    (RecordType::Ds, "DS", 43),
    (RecordType::Rrsig, "RRSIG", 46),
    (RecordType::Nsec, "NSEC", 47),
    (RecordType::Dnskey, "DNSKEY", 48),
    (RecordType::Svcb, "SVCB", 64),
    (RecordType::Https, "HTTPS", 65),
    (RecordType::Any, "ANY", ANY_TYPE_CODE),
    (RecordType::Caa, "CAA", 257),
];

impl RecordType {
    /// Numeric type code.
    pub fn code(self) -> u16 {
        if let Self::Other(n) = self {
            return n;
        }
        REGISTRY
            .iter()
            .find(|(t, _, _)| *t == self)
            .map_or(ANY_TYPE_CODE, |(_, _, code)| *code)
    }

    /// Registry mnemonic, `None` for [`Other`](Self::Other).
    pub fn mnemonic(self) -> Option<&'static str> {
        REGISTRY
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, name, _)| *name)
    }

    /// Map a numeric code back to a type.
    pub fn from_code(code: u16) -> Self {
        REGISTRY
            .iter()
            .find(|(_, _, c)| *c == code)
            .map_or(Self::Other(code), |(t, _, _)| *t)
    }

    /// Parse a mnemonic (`"mx"`, `"AAAA"`) or a generic `TYPE<n>` name.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if let Some((t, _, _)) = REGISTRY.iter().find(|(_, n, _)| *n == upper) {
            return Some(*t);
        }
        upper
            .strip_prefix("TYPE")
            .and_then(|digits| digits.parse::<u16>().ok())
            .map(Self::from_code)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "TYPE{}", self.code()),
        }
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown record type: {name}")))
    }
}

/// Outcome of resolving a caller-supplied type name against the registry.
///
/// Unregistered names are still queryable: they go out on the wire as
/// [`ANY_TYPE_CODE`]. Keeping the variant explicit makes that fallback visible
/// to callers instead of silently turning a typo into an ANY query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLookup {
    /// Name found in the registry.
    Registered(RecordType),
    /// Name not found; queried as ANY.
    Unregistered(String),
}

impl TypeLookup {
    /// Resolve a type name.
    pub fn parse(name: &str) -> Self {
        RecordType::from_name(name).map_or_else(
            || Self::Unregistered(name.trim().to_ascii_uppercase()),
            Self::Registered,
        )
    }

    /// Numeric code sent in the `type` query parameter.
    pub fn wire_code(&self) -> u16 {
        match self {
            Self::Registered(t) => t.code(),
            Self::Unregistered(_) => ANY_TYPE_CODE,
        }
    }

    /// Label used in rendered output (`A`, `TYPE99`, or the unregistered name).
    pub fn label(&self) -> String {
        match self {
            Self::Registered(t) => t.to_string(),
            Self::Unregistered(name) => name.clone(),
        }
    }

    /// Whether this lookup falls back to ANY.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Unregistered(_))
    }
}

impl From<RecordType> for TypeLookup {
    fn from(value: RecordType) -> Self {
        Self::Registered(value)
    }
}

/// DNS response code carried in the DoH `Status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseCode {
    /// 0
    #[default]
    NoError,
    /// 1
    FormErr,
    /// 2
    ServFail,
    /// 3
    NxDomain,
    /// 4
    NotImp,
    /// 5
    Refused,
    /// Any other code, preserved as-is.
    Unknown(u16),
}

impl ResponseCode {
    /// Map a wire code.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NxDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            n => Self::Unknown(n),
        }
    }

    /// Wire code.
    pub fn code(self) -> u16 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::Unknown(n) => n,
        }
    }

    /// Codes that abort result construction for the primary query.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NxDomain | Self::Refused | Self::ServFail)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => f.write_str("NOERROR"),
            Self::FormErr => f.write_str("FORMERR"),
            Self::ServFail => f.write_str("SERVFAIL"),
            Self::NxDomain => f.write_str("NXDOMAIN"),
            Self::NotImp => f.write_str("NOTIMP"),
            Self::Refused => f.write_str("REFUSED"),
            Self::Unknown(n) => write!(f, "UNKNOWN({n})"),
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Self::from_code)
    }
}

/// One resource record row from a DoH JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsAnswerRecord {
    /// Owner name, with or without the trailing dot depending on the provider.
    pub name: String,
    /// Numeric record type.
    #[serde(rename = "type")]
    pub record_type: u16,
    /// Time-to-live in seconds.
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    /// Presentation-format rdata.
    #[serde(default)]
    pub data: String,
}

impl DnsAnswerRecord {
    /// Convenience constructor.
    pub fn new(name: &str, record_type: RecordType, ttl: u32, data: &str) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.code(),
            ttl,
            data: data.to_string(),
        }
    }

    /// Typed view of [`record_type`](Self::record_type).
    pub fn kind(&self) -> RecordType {
        RecordType::from_code(self.record_type)
    }
}

/// Question entry echoed back by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohQuestion {
    /// Queried name.
    pub name: String,
    /// Numeric record type.
    #[serde(rename = "type")]
    pub record_type: u16,
}

/// Header flags of a DoH JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DohFlags {
    /// Truncated.
    #[serde(rename = "TC", default)]
    pub tc: bool,
    /// Recursion desired.
    #[serde(rename = "RD", default)]
    pub rd: bool,
    /// Recursion available.
    #[serde(rename = "RA", default)]
    pub ra: bool,
    /// Authenticated data (DNSSEC validated).
    #[serde(rename = "AD", default)]
    pub ad: bool,
    /// Checking disabled.
    #[serde(rename = "CD", default)]
    pub cd: bool,
}

/// Parsed `application/dns-json` response body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DohEnvelope {
    /// Response code.
    #[serde(rename = "Status", default)]
    pub status: ResponseCode,
    /// Header flags.
    #[serde(flatten)]
    pub flags: DohFlags,
    /// Question section.
    #[serde(rename = "Question", default)]
    pub question: Vec<DohQuestion>,
    /// Answer section.
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DnsAnswerRecord>,
    /// Authority section.
    #[serde(rename = "Authority", default)]
    pub authority: Vec<DnsAnswerRecord>,
    /// Additional section.
    #[serde(rename = "Additional", default)]
    pub additional: Vec<DnsAnswerRecord>,
    /// Free-form resolver comment (a string or an array of strings on the wire).
    #[serde(
        rename = "Comment",
        default,
        deserialize_with = "deserialize_comment",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<String>,
}

impl DohEnvelope {
    /// NS targets from the answer section, falling back to authority, with
    /// trailing dots removed.
    pub fn ns_targets(&self) -> Vec<String> {
        let pick = |records: &[DnsAnswerRecord]| -> Vec<String> {
            records
                .iter()
                .filter(|r| r.kind() == RecordType::Ns)
                .map(|r| r.data.trim_end_matches('.').to_string())
                .collect()
        };
        let from_answer = pick(&self.answer);
        if from_answer.is_empty() {
            pick(&self.authority)
        } else {
            from_answer
        }
    }
}

fn deserialize_comment<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Comment {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<Comment>::deserialize(deserializer)?.map(|comment| match comment {
            Comment::One(text) => text,
            Comment::Many(parts) => parts.join("; "),
        }),
    )
}

/// Public DoH JSON resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DohProvider {
    /// `cloudflare-dns.com`
    #[default]
    Cloudflare,
    /// `dns.google.com`
    Google,
    /// `dns.quad9.net`
    Quad9,
    /// `dns.adguard-dns.com`
    AdGuard,
}

impl DohProvider {
    /// All providers, in preference order.
    pub const ALL: [Self; 4] = [Self::Cloudflare, Self::Google, Self::Quad9, Self::AdGuard];

    /// Human-readable label used as the `SERVER` line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cloudflare => "Cloudflare (1.1.1.1)",
            Self::Google => "Google (8.8.8.8)",
            Self::Quad9 => "Quad9 (9.9.9.9)",
            Self::AdGuard => "AdGuard (94.140.14.14)",
        }
    }

    /// Built-in JSON endpoint.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Cloudflare => "https://cloudflare-dns.com/dns-query",
            Self::Google => "https://dns.google.com/resolve",
            Self::Quad9 => "https://dns.quad9.net:5053/dns-query",
            Self::AdGuard => "https://dns.adguard-dns.com/resolve",
        }
    }
}

impl fmt::Display for DohProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named public resolver the user can pick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameserverPreset {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Resolver IPs, primary first.
    pub servers: &'static [&'static str],
    /// ISO country code of the operator.
    pub country: Option<&'static str>,
    /// DoH endpoint to use; `None` means the query goes through Cloudflare.
    pub doh_provider: Option<DohProvider>,
}

impl NameserverPreset {
    /// `Name (primary-ip)` label.
    pub fn label(&self) -> String {
        match self.servers.first() {
            Some(ip) => format!("{} ({ip})", self.name),
            None => self.name.to_string(),
        }
    }
}

/// Built-in resolver presets.
pub const NAMESERVER_PRESETS: &[NameserverPreset] = &[
    NameserverPreset {
        id: "cloudflare",
        name: "Cloudflare",
        description: "Fast, privacy-focused DNS",
        servers: &["1.1.1.1", "1.0.0.1"],
        country: Some("US"),
        doh_provider: Some(DohProvider::Cloudflare),
    },
    NameserverPreset {
        id: "google",
        name: "Google",
        description: "Google Public DNS",
        servers: &["8.8.8.8", "8.8.4.4"],
        country: Some("US"),
        doh_provider: Some(DohProvider::Google),
    },
    NameserverPreset {
        id: "quad9",
        name: "Quad9",
        description: "Threat-blocking DNS",
        servers: &["9.9.9.9", "149.112.112.112"],
        country: Some("CH"),
        doh_provider: Some(DohProvider::Quad9),
    },
    NameserverPreset {
        id: "adguard",
        name: "AdGuard",
        description: "Ad-blocking DNS",
        servers: &["94.140.14.14", "94.140.15.15"],
        country: Some("CY"),
        doh_provider: Some(DohProvider::AdGuard),
    },
    NameserverPreset {
        id: "opendns",
        name: "OpenDNS",
        description: "Cisco OpenDNS",
        servers: &["208.67.222.222", "208.67.220.220"],
        country: Some("US"),
        doh_provider: None,
    },
    NameserverPreset {
        id: "yandex",
        name: "Yandex.DNS",
        description: "Yandex public DNS",
        servers: &["77.88.8.8", "77.88.8.1"],
        country: Some("RU"),
        doh_provider: None,
    },
    NameserverPreset {
        id: "nextdns",
        name: "NextDNS",
        description: "Configurable cloud DNS",
        servers: &["45.90.28.0", "45.90.30.0"],
        country: Some("US"),
        doh_provider: None,
    },
    NameserverPreset {
        id: "mullvad",
        name: "Mullvad",
        description: "No-logging private DNS",
        servers: &["194.242.2.2", "194.242.2.3"],
        country: Some("SE"),
        doh_provider: None,
    },
];

/// Look up a preset by id.
pub fn find_preset(id: &str) -> Option<&'static NameserverPreset> {
    NAMESERVER_PRESETS.iter().find(|p| p.id == id)
}

/// Which resolver(s) the primary query should go through.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum NameserverSelection {
    /// Cloudflare.
    #[default]
    Default,
    /// A built-in preset.
    Preset {
        /// Preset id, see [`NAMESERVER_PRESETS`].
        id: String,
    },
    /// All resolvers.
    All,
    /// The domain's own authoritative servers.
    Authoritative,
    /// User-supplied resolver addresses.
    Custom {
        /// Resolver addresses; must not be empty.
        servers: Vec<String>,
    },
}

impl NameserverSelection {
    /// `Custom` needs at least one non-blank server.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Custom { servers } => servers.iter().any(|s| !s.trim().is_empty()),
            _ => true,
        }
    }
}

/// Optional output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Render the equivalent `dig` command line.
    pub show_command: bool,
    /// Produce a `+trace`-style transcript.
    pub trace: bool,
    /// Produce a WHOIS/RDAP record.
    pub whois: bool,
    /// Produce a non-recursive delegation walk.
    pub no_recursive: bool,
}

/// A nameserver from the static TLD reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TldNameserver {
    /// Host name (upper-case, as published by IANA).
    pub name: String,
    /// IPv4 glue.
    pub ipv4: Option<String>,
    /// IPv6 glue.
    pub ipv6: Option<String>,
}

/// Static reference data for one TLD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TldNameserverEntry {
    /// Table key (ACE form).
    pub tld: String,
    /// Display form (`рф` for `xn--p1ai`).
    pub display: String,
    /// Up to five servers.
    pub nameservers: Vec<TldNameserver>,
}

/// The normalized submission a result was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedQuery {
    /// Input exactly as submitted.
    pub raw_input: String,
    /// Lower-case Unicode form, used for display and WHOIS.
    pub normalized_domain: String,
    /// ASCII (Punycode) form, used for every DNS call.
    pub punycode_domain: String,
    /// Record type label (`A`, `MX`, ...).
    pub record_type: String,
    /// When the query was submitted.
    pub timestamp: DateTime<Utc>,
}

/// Derived statistics shown next to the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    /// Wall-clock time of the whole orchestration, in milliseconds.
    pub query_time_ms: u64,
    /// Label of the resolver that answered.
    pub server: String,
    /// Local timestamp in `DD.MM.YYYY, HH:MM:SS` form.
    pub when: String,
    /// Status label (`NOERROR`, `UNKNOWN(9)`, ...).
    pub status: String,
    /// Header flags of the primary response.
    pub flags: DohFlags,
    /// Current NS set of the domain (may be empty).
    pub authoritative_nameservers: Vec<String>,
    /// First three TLD reference servers (may be empty).
    pub tld_nameservers: Vec<TldNameserver>,
}

/// Everything produced for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// The normalized query.
    pub query: ResolvedQuery,
    /// Full primary response.
    pub envelope: DohEnvelope,
    /// Derived statistics.
    pub stats: QueryStats,
    /// Short "DNS Lookup Result" view.
    pub summary_output: String,
    /// BIND-style records.
    pub bind_output: String,
    /// Full dig-style transcript.
    pub dig_full_output: String,
    /// `+trace` transcript, when requested.
    pub trace_output: Option<String>,
    /// WHOIS record, when requested.
    pub whois_output: Option<String>,
    /// Non-recursive walk, when requested.
    pub non_recursive_output: Option<String>,
    /// Equivalent `dig` command line, when requested.
    pub command: Option<String>,
}

impl QueryResult {
    /// Answer section of the primary response.
    pub fn answers(&self) -> &[DnsAnswerRecord] {
        &self.envelope.answer
    }

    /// Authority section of the primary response.
    pub fn authority(&self) -> &[DnsAnswerRecord] {
        &self.envelope.authority
    }

    /// Additional section of the primary response.
    pub fn additional(&self) -> &[DnsAnswerRecord] {
        &self.envelope.additional
    }
}
