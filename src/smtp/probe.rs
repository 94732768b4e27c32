use tracing::debug;

use super::options::ProbeOptions;
use super::session::{SmtpSession, Transport};
use super::types::{ProbeOutcome, ProbeStage, SmtpEvent};
use crate::mx::MxHost;

/// Executes the envelope dialog for exactly one recipient.
///
/// Implementations never fail outward: network and protocol problems are
/// folded into the returned [`ProbeOutcome`].
pub trait Probe {
    fn probe(&self, candidate: &str, sender: &str, mx: &MxHost) -> ProbeOutcome;
}

impl<P: Probe + ?Sized> Probe for &P {
    fn probe(&self, candidate: &str, sender: &str, mx: &MxHost) -> ProbeOutcome {
        (**self).probe(candidate, sender, mx)
    }
}

/// [`Probe`] over plaintext TCP, one fresh connection per call.
#[derive(Debug, Clone, Default)]
pub struct SmtpProber {
    options: ProbeOptions,
}

impl SmtpProber {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }
}

impl Probe for SmtpProber {
    fn probe(&self, candidate: &str, sender: &str, mx: &MxHost) -> ProbeOutcome {
        let options = &self.options;
        let outcome = match SmtpSession::connect(mx.as_str(), options.port, options.timeout) {
            Ok(mut session) => {
                session.record_transcript(options.record_transcript);
                let outcome = run_dialog(&mut session, options.helo_name(), sender, candidate);
                session.close();
                let transcript = session.take_transcript();
                outcome.with_transcript(transcript)
            }
            Err(err) => {
                let outcome = ProbeOutcome::transport(ProbeStage::Connect, &err);
                if options.record_transcript {
                    outcome.with_transcript(vec![SmtpEvent::Error {
                        stage: ProbeStage::Connect,
                        message: format!("{mx}:{}: {err}", options.port),
                    }])
                } else {
                    outcome
                }
            }
        };
        debug!(
            candidate,
            %mx,
            verdict = %outcome.verdict,
            code = ?outcome.raw_code,
            "probe finished"
        );
        outcome
    }
}

/// Greeting → HELO → MAIL FROM → RCPT TO on an open session. Does not close
/// the session; the caller owns teardown.
pub(crate) fn run_dialog<T: Transport>(
    session: &mut SmtpSession<T>,
    helo: &str,
    sender: &str,
    candidate: &str,
) -> ProbeOutcome {
    let greeting = match session.read_greeting() {
        Ok(reply) => reply,
        Err(err) => return ProbeOutcome::transport(ProbeStage::Greeting, &err),
    };
    if !greeting.is_positive_completion() {
        return ProbeOutcome::refused(ProbeStage::Greeting, &greeting);
    }

    let steps = [
        (ProbeStage::Helo, format!("HELO {helo}")),
        (ProbeStage::MailFrom, format!("MAIL FROM:<{sender}>")),
    ];
    for (stage, command) in steps {
        match session.send_command(stage, &command) {
            Ok(reply) if reply.code == 250 => {}
            Ok(reply) => return ProbeOutcome::refused(stage, &reply),
            Err(err) => return ProbeOutcome::transport(stage, &err),
        }
    }

    match session.send_command(ProbeStage::RcptTo, &format!("RCPT TO:<{candidate}>")) {
        Ok(reply) => ProbeOutcome::from_rcpt(&reply),
        Err(err) => ProbeOutcome::transport(ProbeStage::RcptTo, &err),
    }
}
