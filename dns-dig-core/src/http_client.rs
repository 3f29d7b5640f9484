//! HTTP transport seam
//!
//! Every network call in the crate (DoH, RDAP, registry WHOIS pages, IP owner
//! APIs) is a plain GET. They all go through [`HttpTransport`] so tests can
//! substitute canned responses, while [`ReqwestTransport`] does the real work.
//!
//! # Design principles
//! - **Transport returns status and body** - status interpretation is the caller's job
//! - **Unified logging** - one `debug!` per request, truncated bodies
//! - **No retries** - a failed call propagates immediately

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::DigConfig;
use crate::error::{DigError, DigResult};
use crate::utils::log_sanitizer::truncate_for_log;

/// `Accept` header for DoH JSON.
pub const ACCEPT_DNS_JSON: &str = "application/dns-json";
/// `Accept` header for RDAP.
pub const ACCEPT_RDAP_JSON: &str = "application/rdap+json";
/// `Accept` header for plain JSON APIs.
pub const ACCEPT_JSON: &str = "application/json";
/// `Accept` header for HTML pages.
pub const ACCEPT_HTML: &str = "text/html";

/// Raw HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpReply {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A GET-only HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request.
    ///
    /// # Arguments
    /// * `url` - full URL including query string
    /// * `accept` - value of the `Accept` header
    /// * `endpoint` - human-readable endpoint name, used in errors and logs
    ///
    /// Fails only on transport problems; non-2xx statuses are returned as-is.
    async fn get(&self, url: &str, accept: &str, endpoint: &str) -> DigResult<HttpReply>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client honouring the configured timeout and user agent.
    pub fn new(config: &DigConfig) -> DigResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| DigError::Network {
            endpoint: "http client".to_string(),
            detail: format!("Failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, accept: &str, endpoint: &str) -> DigResult<HttpReply> {
        log::debug!("[{endpoint}] GET {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| DigError::Network {
                endpoint: endpoint.to_string(),
                detail: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status().as_u16();
        log::debug!("[{endpoint}] Response Status: {status}");

        let body = response.text().await.map_err(|e| DigError::Network {
            endpoint: endpoint.to_string(),
            detail: format!("Failed to read response body: {e}"),
        })?;

        log::debug!("[{endpoint}] Response Body: {}", truncate_for_log(&body));

        Ok(HttpReply { status, body })
    }
}

/// HTTP helper function set
pub struct HttpUtils;

impl HttpUtils {
    /// Turn a non-2xx reply into [`DigError::UpstreamHttp`].
    pub fn expect_success(reply: HttpReply, endpoint: &str) -> DigResult<String> {
        if reply.is_success() {
            Ok(reply.body)
        } else {
            log::warn!("[{endpoint}] HTTP {}", reply.status);
            Err(DigError::UpstreamHttp {
                endpoint: endpoint.to_string(),
                status: reply.status,
            })
        }
    }

    /// Parse a JSON body
    ///
    /// # Returns
    /// * `Ok(T)` - successfully parsed
    /// * `Err(DigError::Parse)` - parsing failed
    pub fn parse_json<T>(body: &str, endpoint: &str) -> DigResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|e| {
            log::error!("[{endpoint}] JSON parse failed: {e}");
            log::error!("[{endpoint}] Raw response: {}", truncate_for_log(body));
            DigError::Parse {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// GET, require 2xx, decode JSON.
    pub async fn get_json<T>(
        transport: &dyn HttpTransport,
        url: &str,
        accept: &str,
        endpoint: &str,
    ) -> DigResult<T>
    where
        T: DeserializeOwned,
    {
        let reply = transport.get(url, accept, endpoint).await?;
        let body = Self::expect_success(reply, endpoint)?;
        Self::parse_json(&body, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_success_passes_2xx_body() {
        let reply = HttpReply {
            status: 204,
            body: "ok".to_string(),
        };
        assert!(matches!(
            HttpUtils::expect_success(reply, "test"),
            Ok(body) if body == "ok"
        ));
    }

    #[test]
    fn expect_success_maps_non_2xx() {
        let reply = HttpReply {
            status: 503,
            body: String::new(),
        };
        let result = HttpUtils::expect_success(reply, "Google (8.8.8.8)");
        assert!(
            matches!(
                &result,
                Err(DigError::UpstreamHttp { endpoint, status: 503 }) if endpoint == "Google (8.8.8.8)"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn parse_json_valid() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Foo {
            x: i32,
        }
        let result: DigResult<Foo> = HttpUtils::parse_json(r#"{"x":42}"#, "test");
        assert!(
            matches!(&result, Ok(Foo { x: 42 })),
            "unexpected parse result: {result:?}"
        );
    }

    #[test]
    fn parse_json_invalid() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Foo {
            x: i32,
        }
        let result: DigResult<Foo> = HttpUtils::parse_json("not json", "test");
        assert!(
            matches!(&result, Err(DigError::Parse { .. })),
            "unexpected parse result: {result:?}"
        );
    }

    #[test]
    fn reqwest_transport_builds_without_timeout() {
        let config = DigConfig {
            timeout_secs: None,
            ..DigConfig::default()
        };
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
