//! DNS diagnostic engine.
//!
//! Takes a domain, URL, e-mail address or IP literal, queries a public
//! DNS-over-HTTPS JSON resolver and renders the answer the way `dig` would.
//! Optional side channels add a non-recursive delegation walk, a `+trace`
//! transcript and a WHOIS/RDAP record.
//!
//! Everything is stateless apart from the optional in-memory [`QueryHistory`].

mod config;
mod entropy;
mod error;
pub mod format;
mod history;
mod http_client;
mod normalize;
mod services;
pub mod tld;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::DigConfig;
pub use entropy::{EntropySource, FixedEntropy, ThreadEntropy};
pub use error::{DigError, DigResult};
pub use format::{
    DigOutputOptions, bind_line, dig_command, export_filename, to_bind_style, to_full_dig_style,
    to_summary, type_name_to_number, type_number_to_name,
};
pub use history::{HISTORY_CAPACITY, QueryHistory};
pub use http_client::{
    ACCEPT_DNS_JSON, ACCEPT_HTML, ACCEPT_JSON, ACCEPT_RDAP_JSON, HttpReply, HttpTransport,
    ReqwestTransport,
};
pub use normalize::{
    HostKind, NormalizedDomain, from_punycode, is_idn, is_valid_ip, normalize, punycode_decode,
    punycode_encode, to_punycode,
};
pub use services::{
    DigService, DohClient, IpOwner, IpOwnerSource, TldStage, UNKNOWN_ORGANIZATION,
    WhoisResolver, format_organization_name, render_ip_whois, tld_stage_servers,
};
pub use tld::{ROOT_SERVERS, TLD_AUTHORITATIVE_SERVERS};
pub use types::{
    ANY_TYPE_CODE, DnsAnswerRecord, DohEnvelope, DohFlags, DohProvider, DohQuestion,
    NAMESERVER_PRESETS, NameserverPreset, NameserverSelection, QueryOptions, QueryResult,
    QueryStats, RecordType, ResolvedQuery, ResponseCode, TldNameserver, TldNameserverEntry,
    TypeLookup, find_preset,
};
