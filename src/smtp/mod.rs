//! SMTP existence probing.
//!
//! [`SmtpProber`] opens one plaintext session per call, runs
//! `HELO` / `MAIL FROM` / `RCPT TO` for a single recipient and always tears
//! the session down. An RCPT TO reply of exactly `250` is the only accepting
//! outcome.

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::ProbeFailure;
pub use options::ProbeOptions;
pub use probe::{Probe, SmtpProber};
pub use types::{ProbeOutcome, ProbeResult, ProbeStage, SmtpEvent, SmtpReply, Verdict};
