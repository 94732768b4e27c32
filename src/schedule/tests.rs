use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::catchall::SYNTHETIC_PREFIX;
use crate::mx::{Error as MxError, MxHost};
use crate::smtp::{ProbeOutcome, Verdict};

struct StaticMx(Option<&'static str>);

impl MxResolve for StaticMx {
    fn resolve(&self, domain: &Domain) -> Result<MxHost, MxError> {
        match self.0 {
            Some(host) => Ok(MxHost::new(host)),
            None => Err(MxError::NoMxRecords {
                domain: domain.to_string(),
                reason: None,
            }),
        }
    }
}

/// Answers from a code table; synthetic catch-all addresses get
/// `catch_all_code`, unknown addresses 550.
struct Scripted {
    codes: HashMap<String, u16>,
    catch_all_code: u16,
    seen: RefCell<Vec<String>>,
    cancel_after: Cell<Option<(usize, CancelToken)>>,
}

impl Scripted {
    fn new(codes: &[(&str, u16)]) -> Self {
        Self {
            codes: codes
                .iter()
                .map(|(addr, code)| (addr.to_string(), *code))
                .collect(),
            catch_all_code: 550,
            seen: RefCell::new(Vec::new()),
            cancel_after: Cell::new(None),
        }
    }

    fn catch_all(mut self) -> Self {
        self.catch_all_code = 250;
        self
    }

    /// Fires `token` once `probes` probes have been answered.
    fn cancel_after(self, probes: usize, token: CancelToken) -> Self {
        self.cancel_after.set(Some((probes, token)));
        self
    }

    fn seen(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl Probe for Scripted {
    fn probe(&self, candidate: &str, _sender: &str, _mx: &MxHost) -> ProbeOutcome {
        self.seen.borrow_mut().push(candidate.to_string());
        let code = if candidate.starts_with(SYNTHETIC_PREFIX) {
            self.catch_all_code
        } else {
            self.codes.get(candidate).copied().unwrap_or(550)
        };
        if let Some((after, token)) = self.cancel_after.take() {
            if self.seen.borrow().len() >= after {
                token.cancel();
            } else {
                self.cancel_after.set(Some((after, token)));
            }
        }
        ProbeOutcome {
            verdict: Verdict::from_rcpt_code(code),
            raw_code: Some(code),
            error: None,
            transcript: Vec::new(),
        }
    }
}

/// Delegates to `Scripted` after a per-candidate sleep.
struct Sluggish<'a> {
    inner: &'a Scripted,
    latency: HashMap<&'static str, Duration>,
}

impl Probe for Sluggish<'_> {
    fn probe(&self, candidate: &str, sender: &str, mx: &MxHost) -> ProbeOutcome {
        if let Some(latency) = self.latency.get(candidate) {
            thread::sleep(*latency);
        }
        self.inner.probe(candidate, sender, mx)
    }
}

#[derive(Default)]
struct CountingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl Pacer for CountingPacer {
    fn pause(&self, duration: Duration, _cancel: &CancelToken) {
        self.pauses.borrow_mut().push(duration);
    }
}

fn domain() -> Domain {
    Domain::parse("example.com").unwrap()
}

fn candidates() -> Vec<String> {
    ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn quiet() -> RunOptions {
    RunOptions {
        delay: DelayRange::none(),
        seed: Some(1),
        ..RunOptions::default()
    }
}

fn scheduler<'a>(
    mx: StaticMx,
    prober: &'a Scripted,
    pacer: &'a CountingPacer,
) -> Scheduler<StaticMx, &'a Scripted, &'a CountingPacer, FixedClock> {
    Scheduler::new(mx, prober)
        .with_pacer(pacer)
        .with_clock(FixedClock::epoch())
}

fn is_synthetic(address: &str) -> bool {
    address.starts_with(SYNTHETIC_PREFIX)
}

#[test]
fn probes_in_order_with_tri_state_results() {
    let prober = Scripted::new(&[
        ("info@example.com", 250),
        ("a@example.com", 250),
        ("b@example.com", 550),
        ("c@example.com", 451),
    ]);
    let pacer = CountingPacer::default();
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap();

    let order: Vec<&str> = report.results.iter().map(|r| r.candidate.as_str()).collect();
    assert_eq!(order, ["a@example.com", "b@example.com", "c@example.com"]);
    let verdicts: Vec<Verdict> = report.results.iter().map(|r| r.verdict).collect();
    assert_eq!(
        verdicts,
        [Verdict::Accepted, Verdict::Rejected, Verdict::Indeterminate]
    );
    assert_eq!(report.summary.accepted, 1);
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.mx.as_str(), "mx.example.com");
    assert!(report.address_of_record.as_ref().is_some_and(|r| r.accepted));
    assert!(report.catch_all.as_ref().is_some_and(|v| !v.is_catch_all));

    let seen = prober.seen();
    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0], "info@example.com");
    assert!(is_synthetic(&seen[1]));
    assert_eq!(&seen[2..], &candidates()[..]);
}

#[test]
fn catch_all_domain_yields_no_candidate_results() {
    let prober = Scripted::new(&[("info@example.com", 250)]).catch_all();
    let pacer = CountingPacer::default();
    let err = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap_err();

    match err {
        RunError::CatchAllDetected {
            domain,
            verdict,
            address_of_record,
            ..
        } => {
            assert_eq!(domain, "example.com");
            assert!(verdict.is_catch_all);
            assert!(address_of_record.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let seen = prober.seen();
    assert_eq!(seen.len(), 2, "address of record and synthetic probe only");
    assert!(!seen.iter().any(|s| candidates().contains(s)));
    assert!(pacer.pauses.borrow().is_empty());
}

#[test]
fn missing_mx_short_circuits_before_any_probe() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let err = scheduler(StaticMx(None), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::NoMxRecords(MxError::NoMxRecords { .. })
    ));
    assert!(prober.seen().is_empty());
}

#[test]
fn invalid_partition_fails_before_resolution() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let options = RunOptions {
        partition: Some(PartitionSpec {
            total_parts: 3,
            selected_part: 4,
        }),
        ..quiet()
    };
    let err = scheduler(StaticMx(None), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &options, |_| {})
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::InvalidPartition(PartitionError::InvalidPartition {
            selected: 4,
            total: 3
        })
    ));
    assert!(prober.seen().is_empty());
}

#[test]
fn partition_limits_probed_candidates() {
    let list: Vec<String> = (1..=10).map(|i| format!("email{i}@example.com")).collect();
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let options = RunOptions {
        partition: Some(PartitionSpec::new(4, 3).unwrap()),
        no_check: true,
        ..quiet()
    };
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&list, &domain(), "me@sender.test", &options, |_| {})
        .unwrap();
    let probed: Vec<&str> = report.results.iter().map(|r| r.candidate.as_str()).collect();
    assert_eq!(probed, ["email7@example.com", "email8@example.com"]);
}

#[test]
fn no_check_skips_address_of_record() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let options = RunOptions {
        no_check: true,
        ..quiet()
    };
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &options, |_| {})
        .unwrap();
    assert!(report.address_of_record.is_none());
    let seen = prober.seen();
    assert!(is_synthetic(&seen[0]));
    assert!(!seen.contains(&"info@example.com".to_string()));
}

#[test]
fn check_email_overrides_info_and_does_not_gate() {
    let prober = Scripted::new(&[("postmaster@example.com", 550)]);
    let pacer = CountingPacer::default();
    let options = RunOptions {
        check_email: Some("postmaster@example.com".to_string()),
        ..quiet()
    };
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &options, |_| {})
        .unwrap();
    let aor = report.address_of_record.unwrap();
    assert_eq!(aor.candidate, "postmaster@example.com");
    assert_eq!(aor.verdict, Verdict::Rejected);
    assert_eq!(report.results.len(), 3);
}

#[test]
fn pauses_after_every_candidate_within_range() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let delay = DelayRange::new(1.0, 2.0).unwrap();
    let options = RunOptions {
        delay,
        ..quiet()
    };
    let mut announced = 0;
    scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &options, |event| {
            if matches!(event, RunEvent::Pausing(_)) {
                announced += 1;
            }
        })
        .unwrap();
    let pauses = pacer.pauses.borrow();
    assert_eq!(pauses.len(), 3);
    assert_eq!(announced, 3);
    assert!(pauses.iter().all(|d| *d >= delay.min() && *d <= delay.max()));
}

#[test]
fn zero_delay_never_pauses() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap();
    assert!(pacer.pauses.borrow().is_empty());
}

#[test]
fn same_seed_same_delays() {
    let delays = |seed| {
        let prober = Scripted::new(&[]);
        let pacer = CountingPacer::default();
        let options = RunOptions {
            delay: DelayRange::new(20.0, 30.0).unwrap(),
            seed: Some(seed),
            ..RunOptions::default()
        };
        scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
            .run(&candidates(), &domain(), "me@sender.test", &options, |_| {})
            .unwrap();
        pacer.pauses.into_inner()
    };
    assert_eq!(delays(9), delays(9));
}

#[test]
fn cancel_stops_before_next_candidate() {
    let token = CancelToken::new();
    // address of record, catch-all, then the first candidate
    let prober = Scripted::new(&[("a@example.com", 250)]).cancel_after(3, token.clone());
    let pacer = CountingPacer::default();
    let mut cancelled = None;
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .with_cancel_token(token)
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |event| {
            if let RunEvent::Cancelled { remaining } = event {
                cancelled = Some(*remaining);
            }
        })
        .unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.summary.accepted, 1);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(cancelled, Some(2));
    assert_eq!(prober.seen().len(), 3);
}

#[test]
fn cancelled_up_front_probes_nothing() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let sched = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer);
    sched.cancel_token().cancel();
    let report = sched
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(report.catch_all.is_none());
    assert!(prober.seen().is_empty());
}

#[test]
fn events_arrive_in_run_order() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let mut kinds = Vec::new();
    scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run(&candidates()[..1], &domain(), "me@sender.test", &quiet(), |event| {
            kinds.push(match event {
                RunEvent::MxResolved { .. } => "mx",
                RunEvent::AddressOfRecord(_) => "aor",
                RunEvent::CatchAll(_) => "catch-all",
                RunEvent::Probed { index, of, .. } => {
                    assert_eq!((*index, *of), (1, 1));
                    "probed"
                }
                RunEvent::Pausing(_) => "pause",
                RunEvent::Cancelled { .. } => "cancelled",
            });
        })
        .unwrap();
    assert_eq!(kinds, ["mx", "aor", "catch-all", "probed"]);
}

#[test]
fn empty_candidate_list_completes() {
    let prober = Scripted::new(&[]);
    let pacer = CountingPacer::default();
    let report = scheduler(StaticMx(Some("mx.example.com")), &prober, &pacer)
        .run::<String, _>(&[], &domain(), "me@sender.test", &quiet(), |_| {})
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.summary, RunSummary::default());
}

#[test]
fn results_follow_input_order_whatever_the_latency() {
    let prober = Scripted::new(&[("b@example.com", 250)]);
    let sluggish = Sluggish {
        inner: &prober,
        latency: HashMap::from([
            ("a@example.com", Duration::from_millis(30)),
            ("b@example.com", Duration::from_millis(1)),
            ("c@example.com", Duration::from_millis(15)),
        ]),
    };
    let mut streamed = Vec::new();
    let report = Scheduler::new(StaticMx(Some("mx.example.com")), sluggish)
        .with_pacer(NoDelay)
        .with_clock(FixedClock::epoch())
        .run(&candidates(), &domain(), "me@sender.test", &quiet(), |event| {
            if let RunEvent::Probed { result, .. } = event {
                streamed.push(result.candidate.clone());
            }
        })
        .unwrap();

    let order: Vec<String> = report.results.iter().map(|r| r.candidate.clone()).collect();
    assert_eq!(order, candidates());
    assert_eq!(streamed, candidates());
    assert_eq!(&prober.seen()[2..], &candidates()[..]);
    assert_eq!(report.summary.accepted, 1);
}

#[test]
fn cancel_from_another_thread_interrupts_a_long_pause() {
    let prober = Scripted::new(&[]);
    let sched = Scheduler::new(StaticMx(Some("mx.example.com")), &prober)
        .with_pacer(SleepPacer::new(Duration::from_millis(5)))
        .with_clock(FixedClock::epoch());
    let stopper = sched.cancel_token();
    let interrupt = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stopper.cancel();
    });
    let options = RunOptions {
        delay: DelayRange::new(60.0, 60.0).unwrap(),
        ..quiet()
    };

    let started = Instant::now();
    let report = sched
        .run(&candidates(), &domain(), "me@sender.test", &options, |_| {})
        .unwrap();
    interrupt.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.summary.skipped, 2);
}
