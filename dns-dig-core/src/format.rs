//! Text rendering of DoH envelopes.
//!
//! Every output format the crate produces lives here: the short summary, the
//! BIND zone-file style, the full `dig` transcript, the equivalent `dig`
//! command line and the export file name. All functions are pure; the only
//! randomness (the transaction id) comes from the caller's [`EntropySource`].

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::entropy::EntropySource;
use crate::types::{DnsAnswerRecord, DohEnvelope, QueryOptions, RecordType, ResponseCode, TypeLookup};

/// Banner version string of the emulated `dig`.
pub const DIG_VERSION: &str = "9.18.0";

/// Resolver IP used in `dig` commands when the server label carries none.
const DEFAULT_COMMAND_SERVER: &str = "1.1.1.1";

/// Fixed DNS header size, used for the `MSG SIZE` estimate.
const HEADER_BYTES: usize = 12;

/// Name of a numeric record type; unknown codes render as `TYPE<n>`.
pub fn type_number_to_name(code: u16) -> String {
    RecordType::from_code(code).to_string()
}

/// Resolve a type name, see [`TypeLookup::parse`].
pub fn type_name_to_number(name: &str) -> TypeLookup {
    TypeLookup::parse(name)
}

/// Absolute form of a name: exactly one trailing dot.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// One record as a zone-file line: `name.\t\tTTL\tIN\tTYPE\tdata`.
pub fn bind_line(record: &DnsAnswerRecord) -> String {
    format!(
        "{}\t\t{}\tIN\t{}\t{}",
        fqdn(&record.name),
        record.ttl,
        type_number_to_name(record.record_type),
        record.data
    )
}

/// Records in BIND style: answers, then authority, then additional.
///
/// Input order is kept inside each section. No records gives an empty string.
pub fn to_bind_style(
    answer: &[DnsAnswerRecord],
    authority: &[DnsAnswerRecord],
    additional: &[DnsAnswerRecord],
) -> String {
    answer
        .iter()
        .chain(authority)
        .chain(additional)
        .map(bind_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Push a titled section followed by a blank line; empty sections are skipped.
pub(crate) fn push_section(lines: &mut Vec<String>, title: &str, records: &[DnsAnswerRecord]) {
    if records.is_empty() {
        return;
    }
    lines.push(format!(";; {title} SECTION:"));
    lines.extend(records.iter().map(bind_line));
    lines.push(String::new());
}

fn push_question(lines: &mut Vec<String>, envelope: &DohEnvelope) {
    if let Some(question) = envelope.question.first() {
        lines.push(";; QUESTION SECTION:".to_string());
        lines.push(format!(
            ";{}\t\tIN\t{}",
            fqdn(&question.name),
            type_number_to_name(question.record_type)
        ));
        lines.push(String::new());
    }
}

fn question_name(envelope: &DohEnvelope) -> &str {
    envelope
        .question
        .first()
        .map_or("unknown", |q| q.name.as_str())
}

/// Extra inputs of the full `dig` transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigOutputOptions {
    /// Server label for the `;; SERVER:` line.
    pub server: String,
    /// Measured wall time of the query.
    pub query_time_ms: u64,
    /// Status label for the header line, usually `envelope.status.to_string()`.
    pub status_label: String,
    /// Pre-rendered `;; WHEN:` timestamp.
    pub when: String,
}

/// Full `dig`-style transcript of an envelope.
///
/// The transaction id is random and the message size is an estimate; neither
/// is meaningful beyond shape.
pub fn to_full_dig_style(
    envelope: &DohEnvelope,
    type_label: &str,
    options: &DigOutputOptions,
    entropy: &dyn EntropySource,
) -> String {
    let mut lines = vec![
        format!(
            "; <<>> DiG {DIG_VERSION} <<>> {type_label} {}",
            question_name(envelope)
        ),
        ";; global options: +cmd".to_string(),
        ";; Got answer:".to_string(),
        format!(
            ";; ->>HEADER<<- opcode: QUERY, status: {}, id: {}",
            options.status_label,
            entropy.transaction_id()
        ),
    ];

    let flags = &envelope.flags;
    let letters: Vec<&str> = [
        (envelope.status == ResponseCode::NoError, "qr"),
        (flags.rd, "rd"),
        (flags.ra, "ra"),
        (flags.ad, "ad"),
        (flags.cd, "cd"),
        (flags.tc, "tc"),
    ]
    .into_iter()
    .filter_map(|(set, letter)| set.then_some(letter))
    .collect();
    lines.push(format!(
        ";; flags: {}; QUERY: 1, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
        letters.join(" "),
        envelope.answer.len(),
        envelope.authority.len(),
        envelope.additional.len()
    ));

    if let Some(comment) = &envelope.comment {
        lines.push(format!(";; Comment: {comment}"));
    }
    lines.push(String::new());

    push_question(&mut lines, envelope);
    push_section(&mut lines, "ANSWER", &envelope.answer);
    push_section(&mut lines, "AUTHORITY", &envelope.authority);
    push_section(&mut lines, "ADDITIONAL", &envelope.additional);

    lines.push(format!(";; Query time: {} msec", options.query_time_ms));
    lines.push(format!(";; SERVER: {}", options.server));
    lines.push(format!(";; WHEN: {}", options.when));
    lines.push(format!(";; MSG SIZE  rcvd: {}", estimate_size(envelope)));

    lines.join("\n")
}

/// Rough wire size: header, question and a fixed per-record overhead.
fn estimate_size(envelope: &DohEnvelope) -> usize {
    let question: usize = envelope.question.iter().map(|q| q.name.len() + 6).sum();
    let records: usize = envelope
        .answer
        .iter()
        .chain(&envelope.authority)
        .chain(&envelope.additional)
        .map(|r| r.name.len() + r.data.len() + 12)
        .sum();
    HEADER_BYTES + question + records
}

/// Short human-readable summary of an envelope.
pub fn to_summary(envelope: &DohEnvelope, type_label: &str) -> String {
    let flags = &envelope.flags;
    let set: Vec<&str> = [
        (flags.rd, "RD"),
        (flags.ra, "RA"),
        (flags.ad, "AD"),
        (flags.cd, "CD"),
        (flags.tc, "TC"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();

    let mut lines = vec![
        "; <<>> DNS Lookup Result".to_string(),
        format!("; Query: {type_label} {}", question_name(envelope)),
        format!("; Status: {}", envelope.status),
        format!("; Flags: {}", set.join(" ")),
    ];
    if let Some(comment) = &envelope.comment {
        lines.push(format!("; Comment: {comment}"));
    }
    lines.push(String::new());

    push_question(&mut lines, envelope);
    push_section(&mut lines, "ANSWER", &envelope.answer);
    push_section(&mut lines, "AUTHORITY", &envelope.authority);
    push_section(&mut lines, "ADDITIONAL", &envelope.additional);

    lines.push(";; Query executed successfully".to_string());
    lines.push(format!(";; Answer count: {}", envelope.answer.len()));
    lines.push(format!(";; Authority count: {}", envelope.authority.len()));
    lines.push(format!(";; Additional count: {}", envelope.additional.len()));
    lines.join("\n")
}

/// Equivalent `dig` command line for a query.
///
/// The server address is taken from the parenthesised part of `server_label`
/// (`"Google (8.8.8.8)"`); for lists only the first entry is used.
pub fn dig_command(
    type_label: &str,
    domain: &str,
    server_label: &str,
    options: &QueryOptions,
) -> String {
    let server = server_label
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .and_then(|(inner, _)| inner.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_COMMAND_SERVER);

    let mut args = vec![
        "dig".to_string(),
        type_label.to_string(),
        domain.to_string(),
        format!("@{server}"),
    ];
    if options.trace {
        args.push("+trace".to_string());
    }
    if options.no_recursive {
        args.push("+norecurse".to_string());
    }
    args.join(" ")
}

/// File name for exported answers: `<domain>_<DD-MM-YYYY>.txt`.
pub fn export_filename(domain: &str, date: NaiveDate) -> String {
    format!("{domain}_{}.txt", date.format("%d-%m-%Y"))
}

/// Timestamp as shown on `WHEN` lines: `DD.MM.YYYY, HH:MM:SS`.
pub fn format_when<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%d.%m.%Y, %H:%M:%S").to_string()
}

/// Current local time in `WHEN` format.
pub fn now_when() -> String {
    format_when(&Local::now())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entropy::FixedEntropy;
    use crate::types::{DohFlags, DohQuestion};

    fn envelope(status: u16) -> DohEnvelope {
        DohEnvelope {
            status: ResponseCode::from_code(status),
            flags: DohFlags {
                rd: true,
                ra: true,
                ..DohFlags::default()
            },
            question: vec![DohQuestion {
                name: "google.com".to_string(),
                record_type: 1,
            }],
            answer: vec![DnsAnswerRecord::new("google.com", RecordType::A, 300, "142.250.50.46")],
            ..DohEnvelope::default()
        }
    }

    fn dig_options() -> DigOutputOptions {
        DigOutputOptions {
            server: "Cloudflare (1.1.1.1)".to_string(),
            query_time_ms: 42,
            status_label: "NOERROR".to_string(),
            when: "01.02.2025, 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_number_to_name(1), "A");
        assert_eq!(type_number_to_name(257), "CAA");
        assert_eq!(type_number_to_name(99), "TYPE99");
        assert_eq!(type_name_to_number("mx").wire_code(), 15);
        assert_eq!(type_name_to_number("BOGUS").wire_code(), 255);
    }

    #[test]
    fn test_bind_style_empty() {
        assert_eq!(to_bind_style(&[], &[], &[]), "");
    }

    #[test]
    fn test_bind_style_single_answer() {
        let env = envelope(0);
        assert_eq!(
            to_bind_style(&env.answer, &[], &[]),
            "google.com.\t\t300\tIN\tA\t142.250.50.46"
        );
    }

    #[test]
    fn test_bind_style_section_order() {
        let answer = vec![
            DnsAnswerRecord::new("a.test", RecordType::A, 1, "1.1.1.1"),
            DnsAnswerRecord::new("a.test", RecordType::A, 1, "2.2.2.2"),
        ];
        let authority = vec![DnsAnswerRecord::new("test", RecordType::Ns, 2, "ns.test.")];
        let additional = vec![DnsAnswerRecord::new("ns.test", RecordType::Aaaa, 3, "::1")];
        let text = to_bind_style(&answer, &authority, &additional);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("1.1.1.1"));
        assert!(lines[1].ends_with("2.2.2.2"));
        assert!(lines[2].contains("\tNS\t"));
        assert!(lines[3].contains("\tAAAA\t"));
    }

    #[test]
    fn test_fqdn_no_double_dot() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        let rec = DnsAnswerRecord::new("example.com.", RecordType::A, 1, "1.2.3.4");
        assert!(bind_line(&rec).starts_with("example.com.\t"));
    }

    #[test]
    fn test_full_dig_shape() {
        let env = envelope(0);
        let text = to_full_dig_style(&env, "A", &dig_options(), &FixedEntropy(7));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "; <<>> DiG 9.18.0 <<>> A google.com");
        assert_eq!(lines[1], ";; global options: +cmd");
        assert!(lines[3].starts_with(";; ->>HEADER<<- opcode: QUERY, status: NOERROR, id: "));
        let id: u32 = lines[3].rsplit(' ').next().unwrap().parse().unwrap();
        assert!(id <= u32::from(u16::MAX));
        assert_eq!(
            lines[4],
            ";; flags: qr rd ra; QUERY: 1, ANSWER: 1, AUTHORITY: 0, ADDITIONAL: 0"
        );
        assert!(text.contains(";; QUESTION SECTION:\n;google.com.\t\tIN\tA"));
        assert!(text.contains(";; ANSWER SECTION:\ngoogle.com.\t\t300\tIN\tA\t142.250.50.46"));
        assert!(!text.contains("AUTHORITY SECTION"));
        assert!(!text.contains("ADDITIONAL SECTION"));
        assert!(text.contains(";; Query time: 42 msec"));
        assert!(text.contains(";; SERVER: Cloudflare (1.1.1.1)"));
        assert!(text.contains(";; WHEN: 01.02.2025, 10:00:00"));
        assert!(lines.last().unwrap().starts_with(";; MSG SIZE  rcvd: "));
    }

    #[test]
    fn test_full_dig_no_qr_on_error_status() {
        let mut env = envelope(2);
        env.answer.clear();
        env.comment = Some("EDE(22): No Reachable Authority".to_string());
        let text = to_full_dig_style(&env, "A", &dig_options(), &FixedEntropy(0));
        assert!(text.contains(";; flags: rd ra; QUERY: 1, ANSWER: 0"));
        assert!(text.contains(";; Comment: EDE(22): No Reachable Authority"));
        assert!(!text.contains("ANSWER SECTION"));
    }

    #[test]
    fn test_summary() {
        let env = envelope(0);
        let text = to_summary(&env, "A");
        assert!(text.starts_with("; <<>> DNS Lookup Result\n; Query: A google.com\n; Status: NOERROR\n; Flags: RD RA"));
        assert!(text.ends_with(";; Answer count: 1\n;; Authority count: 0\n;; Additional count: 0"));
    }

    #[test]
    fn test_summary_unknown_status() {
        let env = envelope(23);
        assert!(to_summary(&env, "A").contains("; Status: UNKNOWN(23)"));
    }

    #[test]
    fn test_dig_command() {
        let opts = QueryOptions::default();
        assert_eq!(
            dig_command("A", "example.com", "Google (8.8.8.8)", &opts),
            "dig A example.com @8.8.8.8"
        );
        assert_eq!(
            dig_command("MX", "example.com", "Authoritative (a.iana-servers.net, b.iana-servers.net)", &opts),
            "dig MX example.com @a.iana-servers.net"
        );
        let flags = QueryOptions {
            trace: true,
            no_recursive: true,
            ..QueryOptions::default()
        };
        assert_eq!(
            dig_command("A", "example.com", "Authoritative ()", &flags),
            "dig A example.com @1.1.1.1 +trace +norecurse"
        );
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(export_filename("example.com", date), "example.com_07-03-2025.txt");
    }

    #[test]
    fn test_format_when() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_when(&at), "02.01.2025, 03:04:05");
    }
}
