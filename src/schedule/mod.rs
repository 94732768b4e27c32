//! Candidate scheduling.
//!
//! A [`Scheduler`] runs the whole sequence for one domain: partition the
//! candidate list, resolve the MX host once, optionally probe the
//! address-of-record, refuse catch-all domains, then probe each candidate
//! in order with a randomized pause after every probe.
//!
//! Everything is sequential on the calling thread. Timing, timestamps and
//! cancellation are injected through [`Pacer`], [`Clock`] and
//! [`CancelToken`].

mod clock;
mod error;
mod options;
mod pacing;
mod partition;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::RunError;
pub use options::{DebugLevel, RunOptions};
pub use pacing::{CancelToken, DelayRange, NoDelay, Pacer, PacingError, SleepPacer};
pub use partition::{PartitionError, PartitionSpec, split_partition};
pub use types::{RunEvent, RunReport, RunStatus, RunSummary};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::catchall;
use crate::mx::{MxResolve, SystemMxResolver};
use crate::smtp::{Probe, ProbeOptions, ProbeResult, SmtpProber};
use crate::validator::Domain;

pub struct Scheduler<M, P, S = SleepPacer, C = SystemClock> {
    resolver: M,
    prober: P,
    pacer: S,
    clock: C,
    cancel: CancelToken,
}

impl<M: MxResolve, P: Probe> Scheduler<M, P> {
    pub fn new(resolver: M, prober: P) -> Self {
        Self {
            resolver,
            prober,
            pacer: SleepPacer::default(),
            clock: SystemClock,
            cancel: CancelToken::new(),
        }
    }
}

impl<M, P, S, C> Scheduler<M, P, S, C> {
    pub fn with_pacer<S2: Pacer>(self, pacer: S2) -> Scheduler<M, P, S2, C> {
        Scheduler {
            resolver: self.resolver,
            prober: self.prober,
            pacer,
            clock: self.clock,
            cancel: self.cancel,
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> Scheduler<M, P, S, C2> {
        Scheduler {
            resolver: self.resolver,
            prober: self.prober,
            pacer: self.pacer,
            clock,
            cancel: self.cancel,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Another handle to the token this scheduler checks before each probe.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl<M, P, S, C> Scheduler<M, P, S, C>
where
    M: MxResolve,
    P: Probe,
    S: Pacer,
    C: Clock,
{
    /// Runs one validation over `candidates`.
    ///
    /// Fails before any network traffic on a bad partition and before any
    /// probe when the MX lookup fails. A catch-all domain aborts the run
    /// with zero candidate results. Cancellation is not an error: the
    /// report carries [`RunStatus::Cancelled`] and whatever finished.
    pub fn run<T, F>(
        &self,
        candidates: &[T],
        domain: &Domain,
        sender: &str,
        options: &RunOptions,
        mut observer: F,
    ) -> Result<RunReport, RunError>
    where
        T: AsRef<str>,
        F: FnMut(&RunEvent<'_>),
    {
        let started_at = self.clock.now();
        let selected = match &options.partition {
            Some(spec) => spec.select(candidates)?,
            None => candidates,
        };

        let mx = self.resolver.resolve(domain).inspect_err(|err| {
            warn!(%domain, error = %err, "MX resolution failed");
        })?;
        info!(%domain, %mx, candidates = selected.len(), "starting run");
        observer(&RunEvent::MxResolved {
            domain,
            mx: &mx,
        });

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut report = RunReport {
            domain: domain.clone(),
            mx: mx.clone(),
            address_of_record: None,
            catch_all: None,
            results: Vec::with_capacity(selected.len()),
            status: RunStatus::Completed,
            summary: RunSummary::default(),
            started_at,
            finished_at: started_at,
        };

        if !options.no_check {
            if self.cancel.is_cancelled() {
                return Ok(self.finish_cancelled(report, selected.len(), &mut observer));
            }
            let address = options.address_of_record(domain);
            let outcome = self.prober.probe(&address, sender, &mx);
            let result = ProbeResult::new(address, outcome, self.clock.now());
            if !result.accepted {
                warn!(
                    %domain,
                    address = %result.candidate,
                    verdict = %result.verdict,
                    "address of record not accepted"
                );
            }
            observer(&RunEvent::AddressOfRecord(&result));
            report.address_of_record = Some(result);
        }

        if self.cancel.is_cancelled() {
            return Ok(self.finish_cancelled(report, selected.len(), &mut observer));
        }
        let verdict = catchall::detect(&self.prober, domain, sender, &mx, &mut rng, &self.clock);
        observer(&RunEvent::CatchAll(&verdict));
        if verdict.is_catch_all {
            return Err(RunError::CatchAllDetected {
                domain: domain.to_string(),
                mx,
                verdict: Box::new(verdict),
                address_of_record: report.address_of_record.map(Box::new),
            });
        }
        report.catch_all = Some(verdict);

        let of = selected.len();
        for (i, candidate) in selected.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(self.finish_cancelled(report, of, &mut observer));
            }
            let candidate = candidate.as_ref();
            let outcome = self.prober.probe(candidate, sender, &mx);
            let result = ProbeResult::new(candidate, outcome, self.clock.now());
            observer(&RunEvent::Probed {
                index: i + 1,
                of,
                result: &result,
            });
            report.results.push(result);

            let pause = options.delay.sample(&mut rng);
            if !pause.is_zero() {
                debug!(seconds = pause.as_secs_f64(), "pausing before next probe");
                observer(&RunEvent::Pausing(pause));
                self.pacer.pause(pause, &self.cancel);
            }
        }

        report.summary = RunSummary::tally(&report.results, of);
        report.finished_at = self.clock.now();
        info!(%domain, summary = %report.summary, "run completed");
        Ok(report)
    }

    fn finish_cancelled<F>(&self, mut report: RunReport, planned: usize, observer: &mut F) -> RunReport
    where
        F: FnMut(&RunEvent<'_>),
    {
        report.status = RunStatus::Cancelled;
        report.summary = RunSummary::tally(&report.results, planned);
        report.finished_at = self.clock.now();
        info!(domain = %report.domain, summary = %report.summary, "run cancelled");
        observer(&RunEvent::Cancelled {
            remaining: report.summary.skipped,
        });
        report
    }
}

/// Runs a validation against the live network: system resolver, plaintext
/// SMTP on `probe.port`, sleeping between probes.
///
/// [`DebugLevel::Verbose`] turns on transcript recording.
pub fn validate<T, F>(
    candidates: &[T],
    domain: &Domain,
    sender: &str,
    options: &RunOptions,
    probe: ProbeOptions,
    cancel: CancelToken,
    observer: F,
) -> Result<RunReport, RunError>
where
    T: AsRef<str>,
    F: FnMut(&RunEvent<'_>),
{
    if let Some(spec) = &options.partition {
        spec.check()?;
    }
    let mut probe = probe;
    probe.record_transcript |= options.debug >= DebugLevel::Verbose;
    let resolver = SystemMxResolver::with_timeout(probe.timeout)?;
    Scheduler::new(resolver, SmtpProber::new(probe))
        .with_cancel_token(cancel)
        .run(candidates, domain, sender, options, observer)
}

#[cfg(test)]
mod tests;
