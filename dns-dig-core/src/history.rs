//! Bounded in-memory history of successful queries.

use std::collections::VecDeque;

use crate::types::QueryResult;

/// Default number of results kept.
pub const HISTORY_CAPACITY: usize = 10;

/// Most recent query results, newest first.
///
/// Nothing is persisted; the history lives as long as its owner.
#[derive(Debug, Clone)]
pub struct QueryHistory {
    entries: VecDeque<QueryResult>,
    capacity: usize,
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryHistory {
    /// History holding up to [`HISTORY_CAPACITY`] results.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// History holding up to `capacity` results (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a result, evicting the oldest one when full.
    pub fn push(&mut self, result: QueryResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    /// Results, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueryResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&QueryResult> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{DohEnvelope, QueryStats, ResolvedQuery};

    fn result(domain: &str) -> QueryResult {
        QueryResult {
            query: ResolvedQuery {
                raw_input: domain.to_string(),
                normalized_domain: domain.to_string(),
                punycode_domain: domain.to_string(),
                record_type: "A".to_string(),
                timestamp: Utc::now(),
            },
            envelope: DohEnvelope::default(),
            stats: QueryStats {
                query_time_ms: 1,
                server: "Cloudflare (1.1.1.1)".to_string(),
                when: String::new(),
                status: "NOERROR".to_string(),
                flags: Default::default(),
                authoritative_nameservers: Vec::new(),
                tld_nameservers: Vec::new(),
            },
            summary_output: String::new(),
            bind_output: String::new(),
            dig_full_output: String::new(),
            trace_output: None,
            whois_output: None,
            non_recursive_output: None,
            command: None,
        }
    }

    #[test]
    fn test_newest_first() {
        let mut history = QueryHistory::new();
        history.push(result("a.test"));
        history.push(result("b.test"));
        assert_eq!(history.latest().unwrap().query.normalized_domain, "b.test");
        let order: Vec<&str> = history
            .iter()
            .map(|r| r.query.normalized_domain.as_str())
            .collect();
        assert_eq!(order, ["b.test", "a.test"]);
    }

    #[test]
    fn test_keeps_at_most_ten() {
        let mut history = QueryHistory::new();
        for i in 0..15 {
            history.push(result(&format!("d{i}.test")));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.latest().unwrap().query.normalized_domain, "d14.test");
        assert_eq!(history.iter().last().unwrap().query.normalized_domain, "d5.test");
    }

    #[test]
    fn test_clear() {
        let mut history = QueryHistory::with_capacity(0);
        history.push(result("a.test"));
        history.push(result("b.test"));
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
