#![forbid(unsafe_code)]
//! mailprobe_lib: SMTP existence probing for candidate addresses of one domain.

pub mod catchall;
pub mod mx;
pub mod permutation;
pub mod schedule;
pub mod smtp;
pub mod validator;

pub use catchall::{CatchAllVerdict, SYNTHETIC_PREFIX};
pub use mx::{Error as MxError, MxHost, MxRecord, MxResolve, MxStatus, SystemMxResolver, check_mx};
pub use permutation::{PermutationError, PermutationLevel, generate_candidates};
pub use schedule::{
    CancelToken, Clock, DebugLevel, DelayRange, NoDelay, Pacer, PartitionError, PartitionSpec,
    RunError, RunEvent, RunOptions, RunReport, RunStatus, RunSummary, Scheduler, SleepPacer,
    SystemClock, split_partition, validate,
};
pub use smtp::{
    Probe, ProbeFailure, ProbeOptions, ProbeResult, ProbeStage, SmtpEvent, SmtpProber, Verdict,
};
pub use validator::{AddressError, Domain, DomainError, validate_address};
