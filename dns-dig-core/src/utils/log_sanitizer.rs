//! Log truncation for upstream bodies
//!
//! Registry WHOIS pages are full HTML documents and RDAP replies can run to
//! tens of kilobytes; debug logs only ever get a bounded, single-line prefix.

/// Maximum number of bytes of a body included in a log line.
const TRUNCATE_LIMIT: usize = 256;

/// Largest char boundary not above `index` (`str::floor_char_boundary` needs 1.91).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

/// Shorten a body for logging.
///
/// Line breaks are flattened to spaces so one response stays on one log line.
/// Bodies over the limit keep their first `TRUNCATE_LIMIT` bytes plus a
/// `[truncated, total N bytes]` marker.
pub fn truncate_for_log(s: &str) -> String {
    let head = &s[..floor_char_boundary(s, TRUNCATE_LIMIT)];
    let flat: String = head
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if head.len() == s.len() {
        flat
    } else {
        format!("{flat}... [truncated, total {} bytes]", s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_unchanged() {
        let s = r#"{"Status":0}"#;
        assert_eq!(truncate_for_log(s), s);
    }

    #[test]
    fn newlines_flattened() {
        assert_eq!(truncate_for_log("domain: A.RU\nstate: X"), "domain: A.RU state: X");
    }

    #[test]
    fn exactly_at_limit_not_marked() {
        let s = "a".repeat(TRUNCATE_LIMIT);
        assert_eq!(truncate_for_log(&s), s);
    }

    #[test]
    fn html_page_truncated() {
        let s = format!("<html>{}</html>", "x".repeat(TRUNCATE_LIMIT * 4));
        let result = truncate_for_log(&s);
        assert!(result.starts_with("<html>"));
        assert!(result.ends_with(&format!("[truncated, total {} bytes]", s.len())));
    }

    #[test]
    fn cyrillic_not_split() {
        // Each "д" is two bytes.
        let s = "д".repeat(TRUNCATE_LIMIT);
        let result = truncate_for_log(&s);
        assert!(result.contains("... [truncated, total"));
    }
}
