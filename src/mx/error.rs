use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    /// Zero answers, NXDOMAIN, SERVFAIL and timeouts all end up here.
    #[error("no MX records found for {domain}{}", fmt_reason(.reason))]
    NoMxRecords {
        domain: String,
        reason: Option<String>,
    },
}

impl MxError {
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn no_records(domain: impl Into<String>) -> Self {
        Self::NoMxRecords {
            domain: domain.into(),
            reason: None,
        }
    }

    pub(crate) fn lookup(
        domain: impl Into<String>,
        source: &trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::NoMxRecords {
            domain: domain.into(),
            reason: Some(source.to_string()),
        }
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}
