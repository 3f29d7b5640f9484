//! `dig +trace`-style transcript.
//!
//! The root and TLD hops come from the static reference tables in
//! [`crate::tld`]; only the authoritative NS lookup and the final answer are
//! live DoH calls. Byte counts and hop timings are decoration drawn from the
//! entropy source.

use crate::entropy::EntropySource;
use crate::error::DigResult;
use crate::format::{DIG_VERSION, bind_line, fqdn};
use crate::tld::{self, ROOT_SERVERS};
use crate::types::{DohProvider, RecordType, TldNameserver, TldNameserverEntry, TypeLookup};

use super::doh::DohClient;

/// Resolver the trace starts from.
const STUB_RESOLVER: &str = "1.1.1.1";

const ROOT_NS_TTL: u32 = 518_400;
const TLD_NS_TTL: u32 = 172_800;

/// Servers used for the TLD hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldStage {
    pub entry: TldNameserverEntry,
    /// `true` when the TLD is missing from the reference table and the
    /// servers are synthesized.
    pub guessed: bool,
}

/// Reference servers for the TLD hop of `domain`.
pub fn tld_stage_servers(domain: &str) -> TldStage {
    match tld::lookup(domain) {
        Some(entry) => TldStage {
            entry: entry.clone(),
            guessed: false,
        },
        None => TldStage {
            entry: tld::guess_for(&tld::tld_of(domain)),
            guessed: true,
        },
    }
}

fn ns_line(owner: &str, ttl: u32, target: &str) -> String {
    format!("{}\t\t{ttl}\tIN\tNS\t{}", fqdn(owner), fqdn(target))
}

/// `ip#53(name)`; servers without an address use their name on both sides.
fn server_ref(server: &TldNameserver) -> (String, String) {
    let name = server.name.to_lowercase();
    let ip = server.ipv4.clone().unwrap_or_else(|| name.clone());
    (ip, name)
}

fn received(
    entropy: &dyn EntropySource,
    lines: &mut Vec<String>,
    ip: &str,
    name: &str,
    bytes: (u32, u32),
) {
    lines.push(format!(
        ";; Received {} bytes from {ip}#53({name}) in {} ms",
        entropy.in_range(bytes.0, bytes.1),
        entropy.in_range(1, 120)
    ));
    lines.push(String::new());
}

/// Render a `+trace` transcript for `domain` (ASCII form).
pub async fn trace_query(
    doh: &DohClient,
    entropy: &dyn EntropySource,
    domain: &str,
    record_type: &TypeLookup,
    when: &str,
) -> String {
    let mut lines = vec![
        format!(
            "; <<>> DiG {DIG_VERSION} <<>> {} {domain} +trace",
            record_type.label()
        ),
        ";; global options: +cmd".to_string(),
    ];

    // Root hints, as returned by the stub resolver.
    for root in ROOT_SERVERS.iter() {
        lines.push(ns_line(".", ROOT_NS_TTL, &root.name));
    }
    received(entropy, &mut lines, STUB_RESOLVER, STUB_RESOLVER, (200, 1_100));

    // TLD delegation, as returned by one of the roots.
    let stage = tld_stage_servers(domain);
    if stage.guessed {
        lines.push(format!(
            ";; No reference data for .{}; the servers below are a best-effort guess",
            stage.entry.tld
        ));
    }
    for server in &stage.entry.nameservers {
        lines.push(ns_line(&stage.entry.tld, TLD_NS_TTL, &server.name));
    }
    let root_index = entropy.in_range(0, u32::try_from(ROOT_SERVERS.len()).unwrap_or(1));
    let root = usize::try_from(root_index)
        .ok()
        .and_then(|i| ROOT_SERVERS.get(i))
        .or_else(|| ROOT_SERVERS.first());
    if let Some(root) = root {
        let (ip, name) = server_ref(root);
        received(entropy, &mut lines, &ip, &name, (600, 1_300));
    }

    let tld_server = stage.entry.nameservers.first().map(server_ref);
    let final_server =
        match live_hops(doh, entropy, domain, record_type, tld_server, &mut lines).await {
            Ok(server) => Some(server),
            Err(e) => {
                log::warn!("Trace for {domain} failed: {e}");
                lines.push(format!(";; Error during trace: {e}"));
                None
            }
        };

    if let Some(ip) = final_server {
        lines.push(format!(";; SERVER: {ip}#53"));
    }
    lines.push(format!(";; WHEN: {when}"));
    lines.join("\n")
}

/// Authoritative NS and final answer. Returns the address of the last hop.
async fn live_hops(
    doh: &DohClient,
    entropy: &dyn EntropySource,
    domain: &str,
    record_type: &TypeLookup,
    tld_server: Option<(String, String)>,
    lines: &mut Vec<String>,
) -> DigResult<String> {
    let ns_reply = doh.query_ns(domain).await?;
    let ns_records: Vec<_> = ns_reply
        .answer
        .iter()
        .chain(&ns_reply.authority)
        .filter(|r| r.kind() == RecordType::Ns)
        .collect();
    if ns_records.is_empty() {
        lines.push(format!(";; No NS records found for {domain}"));
    }
    lines.extend(ns_records.iter().copied().map(bind_line));
    let (tld_ip, tld_name) =
        tld_server.unwrap_or_else(|| (STUB_RESOLVER.to_string(), STUB_RESOLVER.to_string()));
    received(entropy, lines, &tld_ip, &tld_name, (300, 900));

    let answer = doh
        .query(domain, record_type, DohProvider::Cloudflare)
        .await?;
    lines.extend(answer.answer.iter().map(bind_line));
    let auth = ns_records
        .first()
        .map_or_else(|| STUB_RESOLVER.to_string(), |r| r.data.trim_end_matches('.').to_string());
    received(entropy, lines, &auth, &auth, (50, 600));
    Ok(auth)
}
