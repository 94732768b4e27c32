use thiserror::Error;

use super::partition::PartitionError;
use crate::catchall::CatchAllVerdict;
use crate::mx::{Error as MxError, MxHost};
use crate::smtp::ProbeResult;

/// Run-level failures. Probe-level problems never surface here; they are
/// recorded in the matching [`ProbeResult`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidPartition(#[from] PartitionError),
    #[error(transparent)]
    NoMxRecords(#[from] MxError),
    #[error("{domain} accepts any recipient at {mx}; candidate results would be meaningless")]
    CatchAllDetected {
        domain: String,
        mx: MxHost,
        verdict: Box<CatchAllVerdict>,
        address_of_record: Option<Box<ProbeResult>>,
    },
}
