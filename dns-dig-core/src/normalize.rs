//! Input normalization and IDN handling.
//!
//! Users paste URLs, e-mail addresses, IDN domains with a trailing root dot,
//! or bare IP literals. [`normalize`] turns all of these into one
//! [`NormalizedDomain`] carrying both the display (Unicode) form and the
//! network (ASCII/Punycode) form.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DigError, DigResult};

/// Maximum length of a hostname in its ASCII form.
const MAX_DOMAIN_LEN: usize = 253;

/// ACE prefix of Punycode labels.
const ACE_PREFIX: &str = "xn--";

#[allow(clippy::expect_used)]
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid label pattern")
});

/// What kind of host the input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Ipv4,
    Ipv6,
    Hostname,
}

/// A validated query target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDomain {
    /// Lowercase display form. Used for WHOIS and in rendered text.
    pub unicode: String,
    /// ASCII form. Used for every DNS call.
    pub ascii: String,
    /// Host kind.
    pub kind: HostKind,
}

impl NormalizedDomain {
    /// Whether the target is an IP literal.
    pub fn is_ip(&self) -> bool {
        matches!(self.kind, HostKind::Ipv4 | HostKind::Ipv6)
    }
}

/// Normalize and validate user input.
///
/// # Errors
/// * [`DigError::ValidationError`] - input is blank
/// * [`DigError::InvalidDomain`] - input is neither a hostname nor an IP literal
pub fn normalize(input: &str) -> DigResult<NormalizedDomain> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DigError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }

    let invalid = || DigError::InvalidDomain {
        input: trimmed.to_string(),
    };
    let candidate = extract_host(trimmed).ok_or_else(invalid)?;
    let candidate = candidate.strip_suffix('.').unwrap_or(&candidate);

    if candidate.parse::<Ipv4Addr>().is_ok() {
        return Ok(NormalizedDomain {
            unicode: candidate.to_string(),
            ascii: candidate.to_string(),
            kind: HostKind::Ipv4,
        });
    }
    if candidate.contains(':') {
        let lowered = candidate.to_ascii_lowercase();
        return Ok(NormalizedDomain {
            unicode: lowered.clone(),
            ascii: lowered,
            kind: HostKind::Ipv6,
        });
    }

    let ascii = idna::domain_to_ascii(candidate).map_err(|_| invalid())?;
    if !is_valid_hostname(&ascii) {
        return Err(invalid());
    }

    Ok(NormalizedDomain {
        unicode: from_punycode(&ascii),
        ascii,
        kind: HostKind::Hostname,
    })
}

/// Pull the host out of a URL or e-mail address; anything else is returned as-is.
///
/// `None` when the input carries a scheme but is not a URL with a host.
fn extract_host(input: &str) -> Option<String> {
    let has_scheme = input.contains("://");
    if has_scheme || input.to_ascii_lowercase().starts_with("www.") {
        let with_scheme = if has_scheme {
            input.to_string()
        } else {
            format!("https://{input}")
        };
        if let Ok(url) = Url::parse(&with_scheme)
            && let Some(host) = url.host_str()
        {
            let host = host.trim_start_matches('[').trim_end_matches(']');
            let host = if has_scheme {
                host.strip_prefix("www.").unwrap_or(host)
            } else {
                host
            };
            return Some(host.to_string());
        }
        if has_scheme {
            return None;
        }
    }

    if let Some((_, domain)) = input.rsplit_once('@')
        && !domain.is_empty()
    {
        return Some(domain.to_string());
    }

    Some(input.to_string())
}

/// `label(.label)*`, each label 1-63 chars of `[A-Za-z0-9-]` without an outer hyphen.
fn is_valid_hostname(ascii: &str) -> bool {
    !ascii.is_empty()
        && ascii.len() <= MAX_DOMAIN_LEN
        && ascii.split('.').all(|label| LABEL_RE.is_match(label))
}

/// Convert a domain to its ASCII (Punycode) form.
///
/// Inputs the IDNA mapping rejects are returned lowercased, unchanged otherwise.
pub fn to_punycode(domain: &str) -> String {
    idna::domain_to_ascii(domain).unwrap_or_else(|_| domain.to_lowercase())
}

/// Convert a domain to its Unicode form. Labels that fail to decode stay as-is.
pub fn from_punycode(domain: &str) -> String {
    let (unicode, result) = idna::domain_to_unicode(domain);
    if result.is_err() {
        log::debug!("IDNA decode reported errors for {domain}");
    }
    unicode
}

/// Encode a single label to ACE form (`xn--...`).
///
/// ASCII labels are only lowercased. Returns `None` when the label cannot be
/// encoded.
pub fn punycode_encode(label: &str) -> Option<String> {
    let lowered = label.to_lowercase();
    if lowered.is_ascii() {
        return Some(lowered);
    }
    idna::punycode::encode_str(&lowered).map(|encoded| format!("{ACE_PREFIX}{encoded}"))
}

/// Decode a single ACE label. Labels without the `xn--` prefix are only lowercased.
pub fn punycode_decode(label: &str) -> Option<String> {
    let lowered = label.to_lowercase();
    match lowered.strip_prefix(ACE_PREFIX) {
        Some(encoded) => idna::punycode::decode_to_string(encoded),
        None => Some(lowered),
    }
}

/// Whether a domain contains internationalized labels in either form.
pub fn is_idn(domain: &str) -> bool {
    !domain.is_ascii()
        || domain
            .split('.')
            .any(|label| label.to_ascii_lowercase().starts_with(ACE_PREFIX))
}

/// Whether the string is an IPv4 or IPv6 literal.
pub fn is_valid_ip(s: &str) -> bool {
    s.trim().parse::<IpAddr>().is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_scheme_drops_www() {
        let n = normalize("https://www.Example.com/path").unwrap();
        assert_eq!(n.unicode, "example.com");
        assert_eq!(n.ascii, "example.com");
        assert_eq!(n.kind, HostKind::Hostname);
    }

    #[test]
    fn test_bare_www_kept() {
        let n = normalize("www.example.com").unwrap();
        assert_eq!(n.ascii, "www.example.com");
    }

    #[test]
    fn test_email_takes_domain() {
        let n = normalize("user@Example.RU").unwrap();
        assert_eq!(n.unicode, "example.ru");
        assert_eq!(n.ascii, "example.ru");
    }

    #[test]
    fn test_email_uses_last_at() {
        let n = normalize("a@b@mail.example.org").unwrap();
        assert_eq!(n.ascii, "mail.example.org");
    }

    #[test]
    fn test_ascii_hostnames_lowercase_and_strip_dot() {
        for h in ["Example.COM.", "a.b.c", "xn--p1ai", "sub-domain.Test.org", "A1.b2."] {
            let expected = h.strip_suffix('.').unwrap_or(h).to_lowercase();
            let n = normalize(h).unwrap();
            assert_eq!(n.ascii, expected, "input {h}");
        }
    }

    #[test]
    fn test_only_one_trailing_dot_stripped() {
        assert!(matches!(
            normalize("example.com.."),
            Err(DigError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_idn_keeps_both_forms() {
        let n = normalize("Пример.РФ").unwrap();
        assert_eq!(n.unicode, "пример.рф");
        assert_eq!(n.ascii, "xn--e1afmkfd.xn--p1ai");
    }

    #[test]
    fn test_idn_inside_url() {
        let n = normalize("http://пример.рф/страница").unwrap();
        assert_eq!(n.ascii, "xn--e1afmkfd.xn--p1ai");
        assert_eq!(n.unicode, "пример.рф");
    }

    #[test]
    fn test_ip_literals() {
        let v4 = normalize(" 8.8.8.8 ").unwrap();
        assert_eq!(v4.kind, HostKind::Ipv4);
        assert!(v4.is_ip());

        let v6 = normalize("2606:4700:4700::1111").unwrap();
        assert_eq!(v6.kind, HostKind::Ipv6);

        let bracketed = normalize("https://[2001:DB8::1]:8443/").unwrap();
        assert_eq!(bracketed.ascii, "2001:db8::1");
    }

    #[test]
    fn test_out_of_range_octets_are_not_ipv4() {
        assert!(normalize("256.1.1.1").map_or(true, |n| n.kind != HostKind::Ipv4));
    }

    #[test]
    fn test_rejects_bad_labels() {
        for bad in ["-example.com", "example-.com", "exa mple.com", "a..b", "under_score.com"] {
            assert!(
                matches!(normalize(bad), Err(DigError::InvalidDomain { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_unparseable_urls() {
        for bad in ["http://exa mple.com", "https://", "ftp://exa<mple.com/"] {
            assert!(
                matches!(normalize(bad), Err(DigError::InvalidDomain { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overlong() {
        let label = "a".repeat(63);
        let long = [label.as_str(); 5].join(".");
        assert!(long.len() > MAX_DOMAIN_LEN);
        assert!(normalize(&long).is_err());

        let long_label = format!("{}.com", "a".repeat(64));
        assert!(normalize(&long_label).is_err());
    }

    #[test]
    fn test_blank_is_validation_error() {
        assert!(matches!(
            normalize("   "),
            Err(DigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_punycode_round_trip() {
        for label in ["пример", "München", "例え", "bücher", "ÜBER", "plain"] {
            let encoded = punycode_encode(label).unwrap();
            assert!(encoded.is_ascii());
            assert_eq!(punycode_decode(&encoded).unwrap(), label.to_lowercase());
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(punycode_encode("рф").unwrap(), "xn--p1ai");
        assert_eq!(punycode_encode("münchen").unwrap(), "xn--mnchen-3ya");
        assert_eq!(to_punycode("münchen.de"), "xn--mnchen-3ya.de");
        assert_eq!(from_punycode("xn--mnchen-3ya.de"), "münchen.de");
    }

    #[test]
    fn test_is_idn() {
        assert!(is_idn("пример.рф"));
        assert!(is_idn("xn--e1afmkfd.xn--p1ai"));
        assert!(!is_idn("example.com"));
    }

    #[test]
    fn test_is_valid_ip() {
        assert!(is_valid_ip("1.1.1.1"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip("example.com"));
        assert!(!is_valid_ip("300.1.1.1"));
    }
}
