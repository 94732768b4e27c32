use std::fmt;

use chrono::{DateTime, Utc};

use super::error::ProbeFailure;

/// Dialog step a reply, command or failure belongs to.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// A recorded `SMTP` transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent { stage: ProbeStage, command: String },
    Received { stage: ProbeStage, reply: SmtpReply },
    Error { stage: ProbeStage, message: String },
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {} {}", reply.code, reply.message),
            Self::Error { stage, message } => write!(f, "! {stage}: {message}"),
        }
    }
}

/// Three-way reading of a probe. Only [`Verdict::Accepted`] counts as
/// `accepted = true`; the other two keep apart "mailbox refused" from
/// "could not tell".
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// RCPT TO answered exactly 250.
    Accepted,
    /// RCPT TO answered with a permanent (5xx) failure.
    Rejected,
    /// Temporary failure, unexpected code, transport error or an earlier
    /// dialog step refused.
    Indeterminate,
}

impl Verdict {
    /// Verdict for an RCPT TO reply code. Total over `u16`.
    pub fn from_rcpt_code(code: u16) -> Self {
        match code {
            250 => Self::Accepted,
            500..=599 => Self::Rejected,
            _ => Self::Indeterminate,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Indeterminate => "indeterminate",
        })
    }
}

/// What one SMTP session concluded, before it is tied to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub verdict: Verdict,
    /// Code of the reply that decided the outcome, absent when the session
    /// failed before one arrived.
    pub raw_code: Option<u16>,
    pub error: Option<ProbeFailure>,
    pub transcript: Vec<SmtpEvent>,
}

impl ProbeOutcome {
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    pub(crate) fn from_rcpt(reply: &SmtpReply) -> Self {
        let verdict = Verdict::from_rcpt_code(reply.code);
        let error = match verdict {
            Verdict::Accepted => None,
            _ => Some(ProbeFailure::protocol(ProbeStage::RcptTo, reply)),
        };
        Self {
            verdict,
            raw_code: Some(reply.code),
            error,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn refused(stage: ProbeStage, reply: &SmtpReply) -> Self {
        Self {
            verdict: Verdict::Indeterminate,
            raw_code: Some(reply.code),
            error: Some(ProbeFailure::protocol(stage, reply)),
            transcript: Vec::new(),
        }
    }

    pub(crate) fn transport(stage: ProbeStage, err: &std::io::Error) -> Self {
        Self {
            verdict: Verdict::Indeterminate,
            raw_code: None,
            error: Some(ProbeFailure::Transport {
                stage,
                message: err.to_string(),
            }),
            transcript: Vec::new(),
        }
    }

    pub(crate) fn with_transcript(mut self, transcript: Vec<SmtpEvent>) -> Self {
        self.transcript = transcript;
        self
    }
}

/// Result of probing one candidate; produced once, never updated.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub candidate: String,
    pub accepted: bool,
    pub verdict: Verdict,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub raw_code: Option<u16>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<ProbeFailure>,
    pub checked_at: DateTime<Utc>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Vec::is_empty", default))]
    pub transcript: Vec<SmtpEvent>,
}

impl ProbeResult {
    pub fn new(candidate: impl Into<String>, outcome: ProbeOutcome, checked_at: DateTime<Utc>) -> Self {
        Self {
            candidate: candidate.into(),
            accepted: outcome.accepted(),
            verdict: outcome.verdict,
            raw_code: outcome.raw_code,
            error: outcome.error,
            checked_at,
            transcript: outcome.transcript,
        }
    }
}
