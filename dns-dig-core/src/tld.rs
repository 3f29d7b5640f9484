//! Static root hints and TLD reference nameservers.
//!
//! Best-effort reference data taken from the IANA root zone. It is used to
//! decorate trace output and query stats, never to route a real query.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{TldNameserver, TldNameserverEntry};

/// `(name, ipv4, ipv6)`
type ServerRow = (&'static str, &'static str, Option<&'static str>);

const ROOT_ROWS: &[ServerRow] = &[
    ("a.root-servers.net", "198.41.0.4", Some("2001:503:ba3e::2:30")),
    ("b.root-servers.net", "170.247.170.2", Some("2801:1b8:10::b")),
    ("c.root-servers.net", "192.33.4.12", Some("2001:500:2::c")),
    ("d.root-servers.net", "199.7.91.13", Some("2001:500:2d::d")),
    ("e.root-servers.net", "192.203.230.10", Some("2001:500:a8::e")),
    ("f.root-servers.net", "192.5.5.241", Some("2001:500:2f::f")),
    ("g.root-servers.net", "192.112.36.4", Some("2001:500:12::d0d")),
    ("h.root-servers.net", "198.97.190.53", Some("2001:500:1::53")),
    ("i.root-servers.net", "192.36.148.17", Some("2001:7fe::53")),
    ("j.root-servers.net", "192.58.128.30", Some("2001:503:c27::2:30")),
    ("k.root-servers.net", "193.0.14.129", Some("2001:7fd::1")),
    ("l.root-servers.net", "199.7.83.42", Some("2001:500:9f::42")),
    ("m.root-servers.net", "202.12.27.33", Some("2001:dc3::35")),
];

const RIPN: &[ServerRow] = &[
    ("A.DNS.RIPN.NET", "193.232.128.6", Some("2001:678:17:0:193:232:128:6")),
    ("B.DNS.RIPN.NET", "194.85.252.62", Some("2001:678:16:0:194:85:252:62")),
    ("D.DNS.RIPN.NET", "194.190.124.17", Some("2001:678:18:0:194:190:124:17")),
    ("E.DNS.RIPN.NET", "193.232.142.17", Some("2001:678:15:0:193:232:142:17")),
    ("F.DNS.RIPN.NET", "193.232.156.17", Some("2001:678:14:0:193:232:156:17")),
];

const GTLD: &[ServerRow] = &[
    ("A.GTLD-SERVERS.NET", "192.5.6.30", Some("2001:503:a83e::2:30")),
    ("B.GTLD-SERVERS.NET", "192.33.14.30", Some("2001:503:231d::2:30")),
    ("C.GTLD-SERVERS.NET", "192.26.92.30", Some("2001:503:457e::2:30")),
    ("D.GTLD-SERVERS.NET", "192.31.80.30", Some("2001:500:856e::2:30")),
    ("E.GTLD-SERVERS.NET", "192.12.94.30", Some("2001:503:1779::2:30")),
];

const ORG: &[ServerRow] = &[
    ("A0.ORG.AFILIAS-NST.INFO", "199.19.54.1", None),
    ("A2.ORG.AFILIAS-NST.INFO", "199.19.56.1", None),
    ("B0.ORG.AFILIAS-NST.ORG", "199.19.57.1", None),
    ("B2.ORG.AFILIAS-NST.ORG", "199.19.59.1", None),
    ("C0.ORG.AFILIAS-NST.INFO", "199.19.58.1", None),
];

const IO: &[ServerRow] = &[
    ("A0.NIC.IO", "199.249.112.1", Some("2001:500:13::1")),
    ("A2.NIC.IO", "199.249.114.1", Some("2001:500:13::2")),
    ("B0.NIC.IO", "199.249.116.1", Some("2001:500:13::3")),
    ("C0.NIC.IO", "199.249.118.1", Some("2001:500:13::4")),
    ("D0.NIC.IO", "199.249.120.1", Some("2001:500:13::5")),
];

const DEV: &[ServerRow] = &[
    ("NS1.GOOGLE.COM", "216.239.32.10", None),
    ("NS2.GOOGLE.COM", "216.239.34.10", None),
    ("NS3.GOOGLE.COM", "216.239.36.10", None),
    ("NS4.GOOGLE.COM", "216.239.38.10", None),
];

const UA: &[ServerRow] = &[
    ("HOSTMASTER.UA", "193.19.208.2", None),
    ("NS.UANIC.NET", "193.19.208.4", None),
    ("NS2.UANIC.NET", "193.19.208.5", None),
];

const BY: &[ServerRow] = &[
    ("NS1.OPEN.BY", "178.124.160.10", None),
    ("NS2.OPEN.BY", "178.124.160.11", None),
    ("NS.BYFLIX.BY", "82.209.200.10", None),
];

const KZ: &[ServerRow] = &[
    ("A.NIC.KZ", "194.0.9.1", None),
    ("B.NIC.KZ", "194.0.9.2", None),
    ("C.NIC.KZ", "194.0.9.3", None),
];

/// `(key, display, servers)`; keys are ACE TLDs.
const TLD_ROWS: &[(&str, &str, &[ServerRow])] = &[
    ("ru", "ru", RIPN),
    ("su", "su", RIPN),
    ("xn--p1ai", "рф", RIPN),
    ("com", "com", GTLD),
    ("net", "net", GTLD),
    ("org", "org", ORG),
    ("io", "io", IO),
    ("dev", "dev", DEV),
    ("ua", "ua", UA),
    ("by", "by", BY),
    ("kz", "kz", KZ),
];

/// How many TLD servers are reported in query stats.
pub const STATS_SERVER_COUNT: usize = 3;

fn to_servers(rows: &[ServerRow]) -> Vec<TldNameserver> {
    rows.iter()
        .map(|&(name, ipv4, ipv6)| TldNameserver {
            name: name.to_string(),
            ipv4: Some(ipv4.to_string()),
            ipv6: ipv6.map(str::to_string),
        })
        .collect()
}

/// The 13 root servers.
pub static ROOT_SERVERS: LazyLock<Vec<TldNameserver>> = LazyLock::new(|| to_servers(ROOT_ROWS));

/// Reference nameservers by ACE TLD.
pub static TLD_AUTHORITATIVE_SERVERS: LazyLock<HashMap<&'static str, TldNameserverEntry>> =
    LazyLock::new(|| {
        TLD_ROWS
            .iter()
            .map(|&(key, display, rows)| {
                (
                    key,
                    TldNameserverEntry {
                        tld: key.to_string(),
                        display: display.to_string(),
                        nameservers: to_servers(rows),
                    },
                )
            })
            .collect()
    });

/// Lowercase ACE TLD of a domain, or `""` for single-label input.
///
/// Unicode TLDs are converted, so `пример.рф` yields `xn--p1ai`.
pub fn tld_of(domain: &str) -> String {
    let domain = domain.trim_end_matches('.');
    match domain.rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => {
            let lowered = tld.to_lowercase();
            if lowered.is_ascii() {
                lowered
            } else {
                idna::domain_to_ascii(&lowered).unwrap_or(lowered)
            }
        }
        _ => String::new(),
    }
}

/// Reference entry for the domain's TLD, if known.
pub fn lookup(domain: &str) -> Option<&'static TldNameserverEntry> {
    TLD_AUTHORITATIVE_SERVERS.get(tld_of(domain).as_str())
}

/// First [`STATS_SERVER_COUNT`] reference servers of the domain's TLD; empty if unknown.
pub fn top3(domain: &str) -> Vec<TldNameserver> {
    lookup(domain)
        .map(|entry| {
            entry
                .nameservers
                .iter()
                .take(STATS_SERVER_COUNT)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Guessed entry for a TLD missing from the table: `a.` and `b.<tld>-servers.net`.
pub fn guess_for(tld: &str) -> TldNameserverEntry {
    TldNameserverEntry {
        tld: tld.to_string(),
        display: tld.to_string(),
        nameservers: ["a", "b"]
            .iter()
            .map(|prefix| TldNameserver {
                name: format!("{prefix}.{tld}-servers.net"),
                ipv4: None,
                ipv6: None,
            })
            .collect(),
    }
}
