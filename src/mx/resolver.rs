use std::time::Duration;

use tracing::debug;
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
};

use super::{Error, MxHost, MxRecord, MxStatus};
use crate::validator::Domain;

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] contains the sorted list of records (ascending preference).
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    if domain.trim().is_empty() {
        return Err(Error::EmptyDomain);
    }
    let domain = Domain::parse(domain).map_err(|err| Error::NoMxRecords {
        domain: domain.trim().to_string(),
        reason: Some(err.to_string()),
    })?;
    let resolver = Resolver::from_system_conf().map_err(Error::resolver_init)?;
    resolve_with(&resolver, domain.as_str())
}

/// Records in DNS answer order, empty exchanges dropped.
fn answer_order<R>(resolver: &R, ascii_domain: &str) -> Result<Vec<MxRecord>, Error>
where
    R: LookupMx,
{
    let mut records = resolver
        .lookup_mx(ascii_domain)
        .map_err(|err| Error::lookup(ascii_domain, &err))?;
    records.retain(|record| !record.exchange.is_empty());
    Ok(records)
}

/// Full record list for display, sorted by preference.
pub(crate) fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx,
{
    let mut records = answer_order(resolver, ascii_domain)?;
    records.sort();
    records.dedup();

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

/// Exchange of the first record the resolver returned, preference ignored,
/// or [`Error::NoMxRecords`].
pub(crate) fn primary_with<R>(resolver: &R, domain: &Domain) -> Result<MxHost, Error>
where
    R: LookupMx,
{
    let host = answer_order(resolver, domain.as_str())?
        .into_iter()
        .next()
        .map(|record| MxHost::new(record.exchange))
        .ok_or_else(|| Error::no_records(domain.as_str()))?;
    debug!(%domain, mx = %host, "selected first MX answer");
    Ok(host)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

/// Resolves a domain to the single MX host used by a run.
pub trait MxResolve {
    fn resolve(&self, domain: &Domain) -> Result<MxHost, Error>;
}

/// [`MxResolve`] backed by the system resolver configuration.
pub struct SystemMxResolver {
    resolver: Resolver,
}

impl SystemMxResolver {
    pub fn new() -> Result<Self, Error> {
        let resolver = Resolver::from_system_conf().map_err(Error::resolver_init)?;
        Ok(Self { resolver })
    }

    /// Same as [`SystemMxResolver::new`], with a per-query timeout and no
    /// retries.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let (config, mut opts) = read_system_conf().map_err(Error::resolver_init)?;
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = Resolver::new(config, opts).map_err(Error::resolver_init)?;
        Ok(Self { resolver })
    }
}

impl std::fmt::Debug for SystemMxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMxResolver").finish_non_exhaustive()
    }
}

impl SystemMxResolver {
    /// Records for `domain` in DNS answer order; the first one is what
    /// [`MxResolve::resolve`] selects.
    pub fn answers(&self, domain: &Domain) -> Result<Vec<MxRecord>, Error> {
        answer_order(&self.resolver, domain.as_str())
    }
}

impl MxResolve for SystemMxResolver {
    fn resolve(&self, domain: &Domain) -> Result<MxHost, Error> {
        primary_with(&self.resolver, domain)
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }
}
