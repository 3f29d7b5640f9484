//! Query orchestration.
//!
//! [`DigService`] runs one submission end to end: normalize, optional side
//! channels, primary DoH query, rendering. Network calls are awaited one at a
//! time in a fixed order.

mod doh;
mod ip;
mod trace;
mod walker;
mod whois;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::config::DigConfig;
use crate::entropy::{EntropySource, ThreadEntropy};
use crate::error::{DigError, DigResult};
use crate::format::{
    DigOutputOptions, dig_command, now_when, to_bind_style, to_full_dig_style, to_summary,
};
use crate::http_client::{HttpTransport, ReqwestTransport};
use crate::normalize::{NormalizedDomain, is_valid_ip, normalize};
use crate::tld;
use crate::types::{
    DohProvider, NameserverSelection, QueryOptions, QueryResult, QueryStats, ResolvedQuery,
    TypeLookup, find_preset,
};
use crate::utils::log_sanitizer::truncate_for_log;

pub use doh::DohClient;
pub use ip::{
    IpOwner, IpOwnerSource, UNKNOWN_ORGANIZATION, format_organization_name, render_ip_whois,
};
pub use trace::{TldStage, tld_stage_servers};
pub use whois::WhoisResolver;

/// Label used when every resolver is selected; the query itself goes to Cloudflare.
const ALL_RESOLVERS_LABEL: &str = "All resolvers (1.1.1.1)";

/// Resolver a primary query goes through, and how it is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    provider: DohProvider,
    label: String,
    /// Label `dig_command` reads the server from; placeholders stay out of it.
    command_label: String,
}

impl Route {
    fn new(provider: DohProvider, label: String) -> Self {
        Self {
            provider,
            command_label: label.clone(),
            label,
        }
    }
}

/// Entry point for every lookup.
///
/// Holds only shared handles, so clones are cheap and the service can be used
/// from several tasks at once.
///
/// ```rust,no_run
/// use dns_dig_core::{DigConfig, DigService, NameserverSelection, QueryOptions};
/// # async fn demo() -> dns_dig_core::DigResult<()> {
/// let service = DigService::new(DigConfig::default())?;
/// let result = service
///     .execute("example.com", "A", &NameserverSelection::Default, &QueryOptions::default())
///     .await?;
/// println!("{}", result.dig_full_output);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DigService {
    transport: Arc<dyn HttpTransport>,
    entropy: Arc<dyn EntropySource>,
    config: Arc<DigConfig>,
    doh: DohClient,
    whois: WhoisResolver,
}

impl std::fmt::Debug for DigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DigService {
    /// Service backed by `reqwest` and the thread RNG.
    pub fn new(config: DigConfig) -> DigResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_parts(transport, Arc::new(ThreadEntropy), config))
    }

    /// Service with caller-supplied transport and randomness.
    pub fn with_parts(
        transport: Arc<dyn HttpTransport>,
        entropy: Arc<dyn EntropySource>,
        config: DigConfig,
    ) -> Self {
        let config = Arc::new(config);
        let doh = DohClient::new(transport.clone(), config.clone());
        let whois = WhoisResolver::new(
            transport.clone(),
            doh.clone(),
            config.clone(),
            entropy.clone(),
        );
        Self {
            transport,
            entropy,
            config,
            doh,
            whois,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DigConfig {
        &self.config
    }

    /// The underlying DoH client.
    pub fn doh(&self) -> &DohClient {
        &self.doh
    }

    /// Run one query.
    ///
    /// Order of network calls: authoritative NS, trace, non-recursive walk,
    /// WHOIS, primary query. Side channels never fail the query; their errors
    /// are rendered into their own text.
    ///
    /// # Errors
    /// * [`DigError::ValidationError`] / [`DigError::InvalidDomain`] - bad input
    ///   or selection, raised before any network call
    /// * [`DigError::ProtocolStatus`] - primary query answered `NXDOMAIN`,
    ///   `SERVFAIL` or `REFUSED`
    /// * transport errors of the primary query
    pub async fn execute(
        &self,
        input: &str,
        record_type: &str,
        selection: &NameserverSelection,
        options: &QueryOptions,
    ) -> DigResult<QueryResult> {
        let started = Instant::now();
        let timestamp = Utc::now();

        let domain = normalize(input)?;
        validate_selection(selection)?;
        let lookup = TypeLookup::parse(record_type);
        let type_label = lookup.label();
        log::debug!(
            "Query {} {type_label} (input: {})",
            domain.ascii,
            truncate_for_log(input)
        );

        let tld_nameservers = tld::top3(&domain.ascii);
        let authoritative_nameservers = self.doh.authoritative_nameservers(&domain.ascii).await;
        let route = route(selection, &authoritative_nameservers)?;

        let trace_output = if options.trace {
            Some(self.trace_channel(&domain.ascii, &lookup).await)
        } else {
            None
        };
        let non_recursive_output = if options.no_recursive {
            Some(self.walk_channel(&domain.ascii, &lookup).await)
        } else {
            None
        };
        let whois_output = if options.whois {
            Some(self.whois.lookup(&domain.unicode).await)
        } else {
            None
        };

        let envelope = self.doh.query(&domain.ascii, &lookup, route.provider).await?;
        if envelope.status.is_terminal() {
            log::warn!("{} {type_label}: {}", domain.ascii, envelope.status);
            return Err(DigError::ProtocolStatus {
                code: envelope.status,
                domain: domain.unicode,
            });
        }

        let query_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let when = now_when();
        let status = envelope.status.to_string();

        let summary_output = to_summary(&envelope, &type_label);
        let bind_output = to_bind_style(&envelope.answer, &envelope.authority, &envelope.additional);
        let dig_full_output = to_full_dig_style(
            &envelope,
            &type_label,
            &DigOutputOptions {
                server: route.label.clone(),
                query_time_ms,
                status_label: status.clone(),
                when: when.clone(),
            },
            self.entropy.as_ref(),
        );
        let command = options
            .show_command
            .then(|| dig_command(&type_label, &domain.ascii, &route.command_label, options));

        let NormalizedDomain { unicode, ascii, .. } = domain;
        Ok(QueryResult {
            query: ResolvedQuery {
                raw_input: input.to_string(),
                normalized_domain: unicode,
                punycode_domain: ascii,
                record_type: type_label,
                timestamp,
            },
            stats: QueryStats {
                query_time_ms,
                server: route.label,
                when,
                status,
                flags: envelope.flags,
                authoritative_nameservers,
                tld_nameservers,
            },
            envelope,
            summary_output,
            bind_output,
            dig_full_output,
            trace_output,
            whois_output,
            non_recursive_output,
            command,
        })
    }

    /// WHOIS text for a domain or IP, without running a DNS query.
    pub async fn whois(&self, input: &str) -> DigResult<String> {
        let domain = normalize(input)?;
        Ok(self.whois.lookup(&domain.unicode).await)
    }

    /// `+trace` transcript only.
    pub async fn trace(&self, input: &str, record_type: &str) -> DigResult<String> {
        let domain = normalize(input)?;
        Ok(self
            .trace_channel(&domain.ascii, &TypeLookup::parse(record_type))
            .await)
    }

    /// Non-recursive delegation walk only.
    pub async fn non_recursive(&self, input: &str, record_type: &str) -> DigResult<String> {
        let domain = normalize(input)?;
        Ok(self
            .walk_channel(&domain.ascii, &TypeLookup::parse(record_type))
            .await)
    }

    async fn trace_channel(&self, ascii: &str, lookup: &TypeLookup) -> String {
        let when = now_when();
        trace::trace_query(&self.doh, self.entropy.as_ref(), ascii, lookup, &when).await
    }

    async fn walk_channel(&self, ascii: &str, lookup: &TypeLookup) -> String {
        let when = now_when();
        walker::non_recursive_query(&self.doh, self.entropy.as_ref(), ascii, lookup, &when).await
    }

    /// Owner of an IP address; `Ok(None)` when no source knows it.
    pub async fn ip_owner(&self, ip: &str) -> DigResult<Option<IpOwner>> {
        let ip = ip.trim();
        if !is_valid_ip(ip) {
            return Err(DigError::ValidationError(format!("Not an IP address: {ip}")));
        }
        Ok(ip::ip_owner(self.transport.as_ref(), &self.config, ip).await)
    }
}

/// Reject selections that cannot produce a query.
fn validate_selection(selection: &NameserverSelection) -> DigResult<()> {
    if !selection.is_valid() {
        return Err(DigError::ValidationError(
            "At least one custom nameserver is required".to_string(),
        ));
    }
    if let NameserverSelection::Preset { id } = selection
        && find_preset(id).is_none()
    {
        return Err(DigError::ValidationError(format!(
            "Unknown nameserver preset: {id}"
        )));
    }
    Ok(())
}

fn route(selection: &NameserverSelection, authoritative: &[String]) -> DigResult<Route> {
    let cloudflare = DohProvider::Cloudflare;
    let route = match selection {
        NameserverSelection::Default => Route::new(cloudflare, cloudflare.label().to_string()),
        NameserverSelection::Preset { id } => {
            let preset = find_preset(id).ok_or_else(|| {
                DigError::ValidationError(format!("Unknown nameserver preset: {id}"))
            })?;
            Route::new(preset.doh_provider.unwrap_or(cloudflare), preset.label())
        }
        NameserverSelection::All => Route::new(cloudflare, ALL_RESOLVERS_LABEL.to_string()),
        NameserverSelection::Authoritative if authoritative.is_empty() => Route {
            provider: cloudflare,
            label: "Authoritative (unavailable)".to_string(),
            command_label: "Authoritative ()".to_string(),
        },
        NameserverSelection::Authoritative => Route::new(
            cloudflare,
            format!("Authoritative ({})", authoritative.join(", ")),
        ),
        NameserverSelection::Custom { servers } => {
            let first = servers
                .iter()
                .map(String::as_str)
                .map(str::trim)
                .find(|s| !s.is_empty())
                .ok_or_else(|| {
                    DigError::ValidationError("At least one custom nameserver is required".to_string())
                })?;
            Route::new(cloudflare, format!("Custom ({first})"))
        }
    };
    Ok(route)
}
