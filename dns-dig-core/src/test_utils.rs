//! Test helpers: a scripted HTTP transport and DoH body builders.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::error::{DigError, DigResult};
use crate::http_client::{HttpReply, HttpTransport};

/// `(name, type, ttl, data)`
pub type Row<'a> = (&'a str, u16, u32, &'a str);

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub accept: String,
    pub endpoint: String,
}

enum Scripted {
    Reply(HttpReply),
    Fail(String),
}

// ===== MockTransport =====

/// Answers requests from a table of URL substrings.
///
/// The longest registered pattern contained in the URL wins. Unmatched URLs
/// fail with a network error.
#[derive(Default)]
pub struct MockTransport {
    routes: RwLock<Vec<(String, Scripted)>>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn on(&self, pattern: &str, status: u16, body: &str) {
        self.routes.write().await.push((
            pattern.to_string(),
            Scripted::Reply(HttpReply {
                status,
                body: body.to_string(),
            }),
        ));
    }

    pub async fn fail(&self, pattern: &str, detail: &str) {
        self.routes
            .write()
            .await
            .push((pattern.to_string(), Scripted::Fail(detail.to_string())));
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls whose URL contains `pattern`.
    pub async fn count(&self, pattern: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.url.contains(pattern))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str, accept: &str, endpoint: &str) -> DigResult<HttpReply> {
        self.calls.write().await.push(RecordedCall {
            url: url.to_string(),
            accept: accept.to_string(),
            endpoint: endpoint.to_string(),
        });

        let routes = self.routes.read().await;
        let matched = routes
            .iter()
            .filter(|(pattern, _)| url.contains(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len());

        match matched {
            Some((_, Scripted::Reply(reply))) => Ok(reply.clone()),
            Some((_, Scripted::Fail(detail))) => Err(DigError::Network {
                endpoint: endpoint.to_string(),
                detail: detail.clone(),
            }),
            None => Err(DigError::Network {
                endpoint: endpoint.to_string(),
                detail: format!("no scripted reply for {url}"),
            }),
        }
    }
}

fn rows(records: &[Row<'_>]) -> Vec<serde_json::Value> {
    records
        .iter()
        .map(|&(name, record_type, ttl, data)| {
            json!({ "name": name, "type": record_type, "TTL": ttl, "data": data })
        })
        .collect()
}

/// DoH JSON body with the given status, answer and authority sections.
pub fn doh_body(status: u16, answer: &[Row<'_>], authority: &[Row<'_>]) -> String {
    let question = answer
        .first()
        .or(authority.first())
        .map(|&(name, record_type, _, _)| vec![json!({ "name": name, "type": record_type })])
        .unwrap_or_default();
    json!({
        "Status": status,
        "TC": false,
        "RD": true,
        "RA": true,
        "AD": false,
        "CD": false,
        "Question": question,
        "Answer": rows(answer),
        "Authority": rows(authority),
    })
    .to_string()
}
