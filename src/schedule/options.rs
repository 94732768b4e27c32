use std::fmt;

use super::pacing::DelayRange;
use super::partition::PartitionSpec;

/// How much diagnostic detail a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    #[default]
    Minimal,
    Moderate,
    /// Also keeps the SMTP transcript of every probe.
    Verbose,
}

impl TryFrom<u8> for DebugLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Minimal),
            1 => Ok(Self::Moderate),
            2 => Ok(Self::Verbose),
            other => Err(other),
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minimal => "minimal",
            Self::Moderate => "moderate",
            Self::Verbose => "verbose",
        })
    }
}

/// Knobs for one scheduler run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOptions {
    pub delay: DelayRange,
    pub debug: DebugLevel,
    /// Skip the address-of-record probe.
    pub no_check: bool,
    /// Address-of-record to probe instead of `info@<domain>`.
    pub check_email: Option<String>,
    /// Probe only this slice of the candidate list.
    pub partition: Option<PartitionSpec>,
    /// Seeds delay sampling and the catch-all local-part.
    pub seed: Option<u64>,
}

impl RunOptions {
    pub fn address_of_record(&self, domain: &crate::validator::Domain) -> String {
        match self.check_email.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => domain.address("info"),
        }
    }
}
