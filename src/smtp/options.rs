use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Configuration knobs for [`SmtpProber`](crate::smtp::SmtpProber).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Name announced in `HELO`.
    pub helo_name: String,
    pub port: u16,
    /// Overall deadline for one session: connect plus every read/write.
    pub timeout: Duration,
    /// Keep the command/reply transcript in each result.
    pub record_transcript: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_name: "mailprobe.local".to_string(),
            port: 25,
            timeout: Duration::from_secs(10),
            record_transcript: false,
        }
    }
}

impl ProbeOptions {
    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() {
            "localhost"
        } else {
            trimmed
        }
    }
}
