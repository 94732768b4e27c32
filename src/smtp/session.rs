use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::trace;

use super::types::{ProbeStage, SmtpEvent, SmtpReply};

/// Byte stream a session runs over.
pub(crate) trait Transport: Read + Write {
    /// Bounds the next read and write.
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn shutdown(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Longest reply line accepted, CRLF included.
const MAX_LINE_LEN: usize = 1024;
/// Most lines one (multi-line) reply may span.
const MAX_REPLY_LINES: usize = 64;

/// Re-arms the transport timeout to the time left before every read and
/// write, so no sequence of slow reads can outlive the deadline.
struct Deadlined<T> {
    inner: T,
    deadline: Instant,
}

impl<T: Transport> Deadlined<T> {
    fn arm(&mut self) -> io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out());
        }
        self.inner.set_timeout(remaining)
    }
}

impl<T: Transport> Read for Deadlined<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.read(buf)
    }
}

impl<T: Transport> Write for Deadlined<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One short-lived SMTP session. Every operation shares a single deadline
/// fixed at creation.
pub(crate) struct SmtpSession<T: Transport> {
    reader: BufReader<Deadlined<T>>,
    failed: bool,
    closed: bool,
    transcript: Option<Vec<SmtpEvent>>,
}

impl SmtpSession<TcpStream> {
    /// Opens a plaintext connection to `host:port` over IPv4.
    pub(crate) fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let started = Instant::now();
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()?
            .filter(SocketAddr::is_ipv4)
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                last_err = Some(timed_out());
                break;
            }
            match TcpStream::connect_timeout(addr, remaining) {
                Ok(stream) => {
                    trace!(%addr, "connected");
                    return Ok(Self::with_deadline(stream, started + timeout));
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no IPv4 address for {host}"),
            )
        }))
    }
}

impl<T: Transport> SmtpSession<T> {
    pub(crate) fn new(transport: T, timeout: Duration) -> Self {
        Self::with_deadline(transport, Instant::now() + timeout)
    }

    fn with_deadline(transport: T, deadline: Instant) -> Self {
        Self {
            reader: BufReader::new(Deadlined {
                inner: transport,
                deadline,
            }),
            failed: false,
            closed: false,
            transcript: None,
        }
    }

    pub(crate) fn record_transcript(&mut self, enabled: bool) {
        self.transcript = enabled.then(Vec::new);
    }

    pub(crate) fn take_transcript(&mut self) -> Vec<SmtpEvent> {
        self.transcript.as_mut().map(std::mem::take).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.reader.get_ref().inner
    }

    pub(crate) fn read_greeting(&mut self) -> io::Result<SmtpReply> {
        self.exchange(ProbeStage::Greeting, None)
    }

    pub(crate) fn send_command(
        &mut self,
        stage: ProbeStage,
        command: &str,
    ) -> io::Result<SmtpReply> {
        self.exchange(stage, Some(command))
    }

    /// Best-effort `QUIT` when the stream is still sound, then shutdown.
    /// Safe to call more than once.
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        if !self.failed {
            let _ = self.send_command(ProbeStage::Quit, "QUIT");
        }
        if let Err(err) = self.reader.get_mut().inner.shutdown() {
            trace!(error = %err, "shutdown failed");
        }
        self.closed = true;
    }

    fn exchange(&mut self, stage: ProbeStage, command: Option<&str>) -> io::Result<SmtpReply> {
        let result = self.try_exchange(stage, command);
        match &result {
            Ok(reply) => {
                trace!(%stage, code = reply.code, message = %reply.message, "S");
                self.record(SmtpEvent::Received {
                    stage,
                    reply: reply.clone(),
                });
            }
            Err(err) => {
                self.failed = true;
                trace!(%stage, error = %err, "session failed");
                self.record(SmtpEvent::Error {
                    stage,
                    message: err.to_string(),
                });
            }
        }
        result
    }

    fn try_exchange(&mut self, stage: ProbeStage, command: Option<&str>) -> io::Result<SmtpReply> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "session closed"));
        }
        self.reader.get_mut().arm()?;
        if let Some(command) = command {
            trace!(%stage, command, "C");
            self.record(SmtpEvent::Sent {
                stage,
                command: command.to_string(),
            });
            let stream = self.reader.get_mut();
            stream.write_all(command.as_bytes())?;
            stream.write_all(b"\r\n")?;
            stream.flush()?;
        }
        read_reply(&mut self.reader)
    }

    fn record(&mut self, event: SmtpEvent) {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.push(event);
        }
    }
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "SMTP session deadline exceeded")
}

/// Reads one (possibly multi-line) reply of at most [`MAX_REPLY_LINES`]
/// lines, each at most [`MAX_LINE_LEN`] bytes.
pub(crate) fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<SmtpReply> {
    let mut code = None;
    let mut message_lines = Vec::new();
    loop {
        if message_lines.len() == MAX_REPLY_LINES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply longer than {MAX_REPLY_LINES} lines"),
            ));
        }
        let mut raw = String::new();
        let bytes = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_line(&mut raw)?;
        if bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply",
            ));
        }
        if !raw.ends_with('\n') && bytes == MAX_LINE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply line longer than {MAX_LINE_LEN} bytes"),
            ));
        }
        if raw.ends_with('\n') {
            raw.pop();
            if raw.ends_with('\r') {
                raw.pop();
            }
        }

        if raw.len() < 3 || !raw.is_char_boundary(3) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SMTP reply: '{raw}'"),
            ));
        }
        let code_part = &raw[..3];
        let parsed_code = code_part
            .parse::<u16>()
            .ok()
            .filter(|c| (100..600).contains(c))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid SMTP status code: '{code_part}'"),
                )
            })?;
        if let Some(existing) = code {
            if existing != parsed_code {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                ));
            }
        } else {
            code = Some(parsed_code);
        }
        let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
        let text = raw.get(4..).unwrap_or_default().to_string();
        message_lines.push(text);
        if !continuation {
            break;
        }
    }
    Ok(SmtpReply {
        code: code.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "SMTP reply missing status code")
        })?,
        message: message_lines.join("\n"),
    })
}
