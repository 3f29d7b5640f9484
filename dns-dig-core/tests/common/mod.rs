//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use dns_dig_core::{
    DigConfig, DigError, DigResult, DigService, FixedEntropy, HttpReply, HttpTransport,
};
use serde_json::json;
use tokio::sync::RwLock;

/// Unwrap a `Result`, failing the test with the error when it is `Err`.
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Transport answering from a table of URL substrings.
///
/// The longest matching substring wins; anything else is a network error.
#[derive(Default)]
pub struct StubTransport {
    routes: RwLock<Vec<(String, u16, String)>>,
    urls: RwLock<Vec<String>>,
}

impl StubTransport {
    pub async fn route(&self, pattern: &str, status: u16, body: impl Into<String>) {
        self.routes
            .write()
            .await
            .push((pattern.to_string(), status, body.into()));
    }

    pub async fn urls(&self) -> Vec<String> {
        self.urls.read().await.clone()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, url: &str, _accept: &str, endpoint: &str) -> DigResult<HttpReply> {
        self.urls.write().await.push(url.to_string());
        let routes = self.routes.read().await;
        routes
            .iter()
            .filter(|(pattern, _, _)| url.contains(pattern.as_str()))
            .max_by_key(|(pattern, _, _)| pattern.len())
            .map(|(_, status, body)| HttpReply {
                status: *status,
                body: body.clone(),
            })
            .ok_or_else(|| DigError::Network {
                endpoint: endpoint.to_string(),
                detail: format!("no route for {url}"),
            })
    }
}

/// DoH JSON body; records are `(name, type, ttl, data)`.
pub fn doh_json(status: u16, answer: &[(&str, u16, u32, &str)]) -> String {
    let answer: Vec<_> = answer
        .iter()
        .map(|(name, t, ttl, data)| json!({ "name": name, "type": t, "TTL": ttl, "data": data }))
        .collect();
    json!({
        "Status": status,
        "TC": false,
        "RD": true,
        "RA": true,
        "AD": false,
        "CD": false,
        "Answer": answer,
    })
    .to_string()
}

/// Service over a stub transport with pinned randomness.
pub fn stub_service() -> (DigService, Arc<StubTransport>) {
    let transport = Arc::new(StubTransport::default());
    let service = DigService::with_parts(
        transport.clone(),
        Arc::new(FixedEntropy(42)),
        DigConfig::default(),
    );
    (service, transport)
}
