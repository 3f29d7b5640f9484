//! DNS-over-HTTPS JSON client.

use std::sync::Arc;

use crate::config::DigConfig;
use crate::error::DigResult;
use crate::http_client::{ACCEPT_DNS_JSON, HttpTransport, HttpUtils};
use crate::types::{DohEnvelope, DohProvider, RecordType, TypeLookup};

/// Issues single DoH GET requests. No retries, no cache.
#[derive(Clone)]
pub struct DohClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<DigConfig>,
}

impl DohClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: Arc<DigConfig>) -> Self {
        Self { transport, config }
    }

    /// Request URL for a query.
    pub fn query_url(&self, domain: &str, record_type: &TypeLookup, provider: DohProvider) -> String {
        format!(
            "{}?name={}&type={}",
            self.config.endpoint(provider),
            urlencoding::encode(domain),
            record_type.wire_code()
        )
    }

    /// Query one provider.
    ///
    /// # Errors
    /// * [`DigError::UpstreamHttp`](crate::DigError::UpstreamHttp) - non-2xx reply
    /// * [`DigError::Network`](crate::DigError::Network) - provider unreachable
    /// * [`DigError::Parse`](crate::DigError::Parse) - body is not a DoH envelope
    pub async fn query(
        &self,
        domain: &str,
        record_type: &TypeLookup,
        provider: DohProvider,
    ) -> DigResult<DohEnvelope> {
        if let TypeLookup::Unregistered(name) = record_type {
            log::warn!("Unknown record type {name}, querying {domain} as ANY");
        }
        let url = self.query_url(domain, record_type, provider);
        HttpUtils::get_json(self.transport.as_ref(), &url, ACCEPT_DNS_JSON, provider.label()).await
    }

    /// NS query through Cloudflare.
    pub async fn query_ns(&self, domain: &str) -> DigResult<DohEnvelope> {
        self.query(domain, &RecordType::Ns.into(), DohProvider::Cloudflare)
            .await
    }

    /// Current NS hostnames of a domain, without trailing dots.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn authoritative_nameservers(&self, domain: &str) -> Vec<String> {
        match self.query_ns(domain).await {
            Ok(envelope) => envelope.ns_targets(),
            Err(e) => {
                log::warn!("Failed to get authoritative nameservers for {domain}: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DigError;
    use crate::test_utils::{MockTransport, doh_body};
    use crate::types::ResponseCode;

    fn client(transport: &Arc<MockTransport>) -> DohClient {
        DohClient::new(transport.clone(), Arc::new(DigConfig::default()))
    }

    #[tokio::test]
    async fn test_query_builds_get_with_numeric_type() {
        let transport = Arc::new(MockTransport::new());
        transport
            .on("name=example.com&type=15", 200, &doh_body(0, &[("example.com", 15, 300, "10 mx.example.com.")], &[]))
            .await;
        let doh = client(&transport);

        let envelope = doh
            .query("example.com", &RecordType::Mx.into(), DohProvider::Google)
            .await
            .unwrap();
        assert_eq!(envelope.status, ResponseCode::NoError);
        assert_eq!(envelope.answer.len(), 1);

        let calls = transport.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://dns.google.com/resolve?name=example.com&type=15");
        assert_eq!(calls[0].accept, ACCEPT_DNS_JSON);
        assert_eq!(calls[0].endpoint, "Google (8.8.8.8)");
    }

    #[tokio::test]
    async fn test_unregistered_type_queries_any() {
        let transport = Arc::new(MockTransport::new());
        transport.on("type=255", 200, &doh_body(0, &[], &[])).await;
        let doh = client(&transport);

        let lookup = TypeLookup::parse("NOPE");
        assert!(lookup.is_fallback());
        doh.query("example.com", &lookup, DohProvider::Cloudflare)
            .await
            .unwrap();
        assert!(transport.calls().await[0].url.ends_with("&type=255"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_upstream_http() {
        let transport = Arc::new(MockTransport::new());
        transport.on("dns-query", 502, "bad gateway").await;
        let doh = client(&transport);

        let result = doh
            .query("example.com", &RecordType::A.into(), DohProvider::Cloudflare)
            .await;
        assert!(
            matches!(
                &result,
                Err(DigError::UpstreamHttp { endpoint, status: 502 }) if endpoint == "Cloudflare (1.1.1.1)"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let transport = Arc::new(MockTransport::new());
        transport.on("dns-query", 200, "<html>").await;
        let result = client(&transport)
            .query("example.com", &RecordType::A.into(), DohProvider::Cloudflare)
            .await;
        assert!(matches!(result, Err(DigError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let transport = Arc::new(MockTransport::new());
        transport.on("dns-query", 200, &doh_body(0, &[], &[])).await;
        let doh = client(&transport);
        for _ in 0..2 {
            doh.query("example.com", &RecordType::A.into(), DohProvider::Cloudflare)
                .await
                .unwrap();
        }
        assert_eq!(transport.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_authoritative_nameservers_falls_back_to_authority() {
        let transport = Arc::new(MockTransport::new());
        transport
            .on(
                "name=example.com&type=2",
                200,
                &doh_body(0, &[], &[("example.com", 2, 3600, "a.iana-servers.net.")]),
            )
            .await;
        let ns = client(&transport).authoritative_nameservers("example.com").await;
        assert_eq!(ns, ["a.iana-servers.net"]);
    }

    #[tokio::test]
    async fn test_authoritative_nameservers_swallows_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.fail("dns-query", "connection refused").await;
        let ns = client(&transport).authoritative_nameservers("example.com").await;
        assert!(ns.is_empty());
    }
}
