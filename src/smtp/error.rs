use thiserror::Error;

use super::types::{ProbeStage, SmtpReply};

/// Why a probe did not end in acceptance. Stored in the result, never
/// returned as `Err`.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// Connection refused/reset, timeout, malformed reply.
    #[error("transport failure during {stage}: {message}")]
    Transport { stage: ProbeStage, message: String },
    /// The server answered something other than what the step requires.
    #[error("{stage} answered {code}: {message}")]
    ProtocolRejection {
        stage: ProbeStage,
        code: u16,
        message: String,
    },
}

impl ProbeFailure {
    pub(crate) fn protocol(stage: ProbeStage, reply: &SmtpReply) -> Self {
        Self::ProtocolRejection {
            stage,
            code: reply.code,
            message: reply.message.clone(),
        }
    }

    pub fn stage(&self) -> ProbeStage {
        match self {
            Self::Transport { stage, .. } | Self::ProtocolRejection { stage, .. } => *stage,
        }
    }
}
