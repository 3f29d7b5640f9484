//! Non-recursive delegation walk.
//!
//! Root, TLD, authoritative NS and final answer, each fetched by its own DoH
//! call and rendered step by step. A failure at any step ends the transcript
//! with one error line; the walk itself never fails.

use crate::entropy::EntropySource;
use crate::error::DigResult;
use crate::format::{DIG_VERSION, push_section};
use crate::types::{DohProvider, RecordType, TypeLookup};

use super::doh::DohClient;

/// Render the delegation walk for `domain`.
pub async fn non_recursive_query(
    doh: &DohClient,
    entropy: &dyn EntropySource,
    domain: &str,
    record_type: &TypeLookup,
    when: &str,
) -> String {
    let mut lines = vec![
        format!(
            "; <<>> DiG {DIG_VERSION} <<>> {} {domain} +norecurse",
            record_type.label()
        ),
        ";; global options: +norecurse +cmd".to_string(),
        format!(";; Query time: {when}"),
        String::new(),
    ];

    if let Err(e) = walk(doh, entropy, domain, record_type, when, &mut lines).await {
        log::warn!("Non-recursive walk for {domain} failed: {e}");
        lines.push(format!(";; Error during non-recursive query: {e}"));
    }

    lines.join("\n")
}

fn push_servers(lines: &mut Vec<String>, title: &str, servers: &[String]) {
    if servers.is_empty() {
        return;
    }
    lines.push(title.to_string());
    lines.extend(servers.iter().map(|s| format!(";;   {s}")));
    lines.push(String::new());
}

async fn walk(
    doh: &DohClient,
    entropy: &dyn EntropySource,
    domain: &str,
    record_type: &TypeLookup,
    when: &str,
    lines: &mut Vec<String>,
) -> DigResult<()> {
    // Step 1
    lines.push(";; Step 1: Root Servers".to_string());
    lines.push(";; Querying root servers for TLD nameservers...".to_string());
    lines.push(String::new());
    let root = doh.query_ns(".").await?;
    let root_ns: Vec<String> = root.answer.iter().map(|r| r.data.clone()).collect();
    push_servers(lines, ";; Root NS servers:", &root_ns);

    // Step 2
    if let Some((_, tld)) = domain.rsplit_once('.')
        && !tld.is_empty()
    {
        lines.push(format!(";; Step 2: TLD Servers for .{tld}"));
        lines.push(format!(";; Querying .{tld} TLD nameservers..."));
        lines.push(String::new());
        let tld_reply = doh.query_ns(&format!("{tld}.")).await?;
        let tld_ns: Vec<String> = tld_reply.answer.iter().map(|r| r.data.clone()).collect();
        push_servers(lines, &format!(";; .{tld} TLD NS servers:"), &tld_ns);
    }

    // Step 3
    lines.push(";; Step 3: Authoritative Nameservers".to_string());
    lines.push(format!(";; Querying authoritative nameservers for {domain}..."));
    lines.push(String::new());
    let ns_reply = doh.query_ns(domain).await?;
    let auth_ns: Vec<String> = ns_reply
        .answer
        .iter()
        .filter(|r| r.kind() == RecordType::Ns)
        .map(|r| r.data.trim_end_matches('.').to_string())
        .collect();
    let Some(auth_server) = auth_ns.first().cloned() else {
        lines.push(format!(";; No NS records found for {domain}"));
        return Ok(());
    };
    push_servers(lines, ";; Authoritative NS servers:", &auth_ns);

    // Step 4
    let last = doh
        .query(domain, record_type, DohProvider::Cloudflare)
        .await?;
    lines.push(";; Step 4: Final Query".to_string());
    push_section(lines, "ANSWER", &last.answer);
    push_section(lines, "AUTHORITY", &last.authority);
    push_section(lines, "ADDITIONAL", &last.additional);
    lines.push(format!(";; Query time: {} msec", entropy.in_range(0, 100)));
    lines.push(format!(";; SERVER: {auth_server}"));
    lines.push(format!(";; WHEN: {when}"));
    Ok(())
}
