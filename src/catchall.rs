//! Catch-all detection: one probe against a local-part nobody would guess.

use rand::Rng;
use tracing::{debug, warn};

use crate::mx::MxHost;
use crate::schedule::Clock;
use crate::smtp::{Probe, ProbeResult};
use crate::validator::Domain;

/// Prefix of every synthetic local-part, so the probe is recognisable in
/// server logs.
pub const SYNTHETIC_PREFIX: &str = "mailprobe-";
const SYNTHETIC_LEN: usize = 10;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchAllVerdict {
    pub domain: Domain,
    pub is_catch_all: bool,
    /// The synthetic probe the verdict was derived from.
    pub probe: ProbeResult,
}

/// `mailprobe-` followed by ten lowercase letters drawn uniformly.
pub fn synthetic_local_part<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut local = String::with_capacity(SYNTHETIC_PREFIX.len() + SYNTHETIC_LEN);
    local.push_str(SYNTHETIC_PREFIX);
    local.extend((0..SYNTHETIC_LEN).map(|_| char::from(rng.gen_range(b'a'..=b'z'))));
    local
}

/// Probes one synthetic address on `domain` through `mx`. An accepting
/// server accepts anything, so the run must stop.
pub fn detect<P, R, C>(
    prober: &P,
    domain: &Domain,
    sender: &str,
    mx: &MxHost,
    rng: &mut R,
    clock: &C,
) -> CatchAllVerdict
where
    P: Probe + ?Sized,
    R: Rng + ?Sized,
    C: Clock + ?Sized,
{
    let address = domain.address(&synthetic_local_part(rng));
    let outcome = prober.probe(&address, sender, mx);
    let probe = ProbeResult::new(address, outcome, clock.now());

    if probe.accepted {
        warn!(%domain, %mx, address = %probe.candidate, "domain accepts any recipient");
    } else {
        debug!(%domain, %mx, verdict = %probe.verdict, "catch-all probe refused");
    }

    CatchAllVerdict {
        domain: domain.clone(),
        is_catch_all: probe.accepted,
        probe,
    }
}
