use super::{Error, MxHost, MxRecord, MxStatus, resolver};
use crate::validator::Domain;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

type LookupResult = Result<Vec<MxRecord>, ResolveError>;
type LookupFn = dyn Fn(&str) -> LookupResult;

pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
}

impl StubResolver {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + 'static,
    {
        Self {
            on_lookup: Box::new(f),
        }
    }
}

fn domain() -> Domain {
    Domain::parse("example.com").expect("valid domain")
}

#[test]
fn check_mx_rejects_empty() {
    let err = super::check_mx("  ").expect_err("empty domain should fail");
    assert!(matches!(err, Error::EmptyDomain));
}

#[test]
fn resolve_with_sorts_and_dedups_records() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![
            MxRecord::new(20, "mx2.example.com"),
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(30, "mx3.example.com"),
        ])
    });

    let status = resolver::resolve_with(&stub, "example.com").expect("lookup succeeds");
    let records = match status {
        MxStatus::Records(records) => records,
        MxStatus::NoRecords => panic!("expected records"),
    };
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].preference, 10);
    assert_eq!(records[0].exchange, "mx1.example.com");
    assert_eq!(records[2].preference, 30);
}

#[test]
fn resolve_with_handles_no_records() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(Vec::new())
    });

    let status = resolver::resolve_with(&stub, "example.com").expect("lookup succeeds");
    assert!(matches!(status, MxStatus::NoRecords));
}

#[test]
fn primary_is_first_answer_regardless_of_preference() {
    let stub = StubResolver::new(|_| {
        Ok(vec![
            MxRecord::new(20, "backup.example.com"),
            MxRecord::new(5, "b.example.com"),
            MxRecord::new(5, "a.example.com"),
        ])
    });
    let host = resolver::primary_with(&stub, &domain()).expect("primary");
    assert_eq!(host, MxHost::new("backup.example.com"));

    // the display list is still sorted
    let status = resolver::resolve_with(&stub, "example.com").expect("lookup succeeds");
    let order: Vec<&str> = status.records().iter().map(|r| r.exchange.as_str()).collect();
    assert_eq!(order, ["a.example.com", "b.example.com", "backup.example.com"]);
}

#[test]
fn primary_skips_empty_exchanges() {
    let stub = StubResolver::new(|_| {
        Ok(vec![
            MxRecord::new(0, ""),
            MxRecord::new(30, "mx3.example.com"),
            MxRecord::new(10, "mx1.example.com"),
        ])
    });
    let host = resolver::primary_with(&stub, &domain()).expect("primary");
    assert_eq!(host.as_str(), "mx3.example.com");
}

#[test]
fn primary_without_records_is_no_mx() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let err = resolver::primary_with(&stub, &domain()).expect_err("no records");
    match err {
        Error::NoMxRecords { domain, reason } => {
            assert_eq!(domain, "example.com");
            assert!(reason.is_none());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn lookup_failure_folds_into_no_mx() {
    let stub = StubResolver::new(|_| Err(ResolveError::from(ResolveErrorKind::Message("SERVFAIL"))));
    let err = resolver::primary_with(&stub, &domain()).expect_err("lookup fails");
    match err {
        Error::NoMxRecords { reason, .. } => {
            assert!(reason.expect("reason kept").contains("SERVFAIL"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    let out = resolver::normalize_exchange("Mail.EXAMPLE.com.".to_string());
    assert_eq!(out, "mail.example.com");
}
