//! The SMTP transaction engine: one connection, driven strictly
//! command-by-command.

use std::io::{self, BufRead, BufReader, Write};
use std::net::Shutdown;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};

use crate::smtp::authentication::{Credentials, Mechanism, MECHANISM_FALLBACK_ORDER};
use crate::smtp::client::net::{NetworkStream, TlsParameters};
use crate::smtp::client::{escape_crlf, ClientCodec};
use crate::smtp::commands::{Auth, AuthResponse, Command, Data, Ehlo, Helo, Mail, Quit, Rcpt, Rset};
use crate::smtp::error::{self, Error};
use crate::smtp::extension::{ClientId, ServerInfo};
use crate::smtp::response::{parse_response, Response};
use crate::smtp::transcript::{Step, Transcript};
use crate::validate;

/// An open SMTP session.
///
/// Commands are strictly sequential: every one blocks until its terminating
/// reply line (or a timeout) arrives. A connection owns its stream and its
/// diagnostic [`Transcript`]; nothing is shared between connections, so
/// distinct sessions can be driven from distinct threads freely.
#[derive(Debug)]
pub struct SmtpConnection {
    /// Buffered stream between client and server.
    stream: BufReader<NetworkStream>,
    /// Set once the connection is known broken; further commands are
    /// refused.
    panic: bool,
    /// What the server advertised in its EHLO reply.
    server_info: ServerInfo,
    /// Raw replies for the most recent operation.
    transcript: Transcript,
}

impl SmtpConnection {
    /// Opens a connection and runs the session handshake: greeting, EHLO
    /// (falling back to HELO), and authentication when credentials are
    /// given.
    ///
    /// On any handshake failure the half-open connection is torn down before
    /// the error is returned.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        read_timeout: Duration,
        tls: Option<&TlsParameters>,
        local_name: &ClientId,
        credentials: Option<&Credentials>,
        mechanism: Option<Mechanism>,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(host, port, timeout, tls)?;
        let mut conn = SmtpConnection::from_stream(stream);
        match conn.handshake(read_timeout, local_name, credentials, mechanism) {
            Ok(()) => Ok(conn),
            Err(e) => {
                conn.abort();
                Err(e)
            }
        }
    }

    pub(crate) fn from_stream(stream: NetworkStream) -> SmtpConnection {
        SmtpConnection {
            stream: BufReader::new(stream),
            panic: false,
            server_info: ServerInfo::default(),
            transcript: Transcript::default(),
        }
    }

    fn handshake(
        &mut self,
        read_timeout: Duration,
        local_name: &ClientId,
        credentials: Option<&Credentials>,
        mechanism: Option<Mechanism>,
    ) -> Result<(), Error> {
        // the connect timeout no longer applies; reads get a shorter bound
        self.set_timeout(Some(read_timeout)).map_err(error::network)?;
        self.read_reply(Step::Banner, &[220])?;
        self.greet(local_name)?;
        if let Some(credentials) = credentials {
            self.authenticate(credentials, mechanism)?;
        }
        Ok(())
    }

    /// Sends EHLO, falling back to HELO when the server rejects it.
    fn greet(&mut self, local_name: &ClientId) -> Result<(), Error> {
        match self.ehlo(local_name) {
            Ok(()) => Ok(()),
            Err(e) if e.is_protocol() => {
                warn!("EHLO rejected ({e}), falling back to HELO");
                self.command(&Helo::new(local_name.clone())).map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    /// Send EHLO and update server info
    fn ehlo(&mut self, local_name: &ClientId) -> Result<(), Error> {
        let response = self.command(&Ehlo::new(local_name.clone()))?;
        self.server_info = ServerInfo::from_response(&response)?;
        debug!("server {}", self.server_info);
        Ok(())
    }

    /// Authenticates with the forced mechanism, or negotiates one.
    ///
    /// Negotiation tries the server-advertised default first, then the
    /// advertised mechanisms in LOGIN, PLAIN, CRAM-MD5 order, then the
    /// remaining mechanisms blindly in the same order. A server rejection
    /// moves on to the next candidate; a dead connection aborts the ladder.
    fn authenticate(
        &mut self,
        credentials: &Credentials,
        mechanism: Option<Mechanism>,
    ) -> Result<(), Error> {
        let candidates = match mechanism {
            Some(forced) => vec![forced],
            None => {
                let default = self.server_info.default_mechanism();
                let advertised = self.server_info.auth_mechanisms().to_vec();
                let mut candidates = Vec::new();
                if let Some(default) = default {
                    candidates.push(default);
                }
                for &m in MECHANISM_FALLBACK_ORDER {
                    if advertised.contains(&m) && Some(m) != default {
                        candidates.push(m);
                    }
                }
                for &m in MECHANISM_FALLBACK_ORDER {
                    if !advertised.contains(&m) && Some(m) != default {
                        candidates.push(m);
                    }
                }
                candidates
            }
        };

        for mechanism in candidates {
            match self.try_auth(mechanism, credentials) {
                Ok(_) => {
                    debug!("authenticated with {mechanism}");
                    return Ok(());
                }
                Err(e) if e.is_network() || e.is_tls() => return Err(e),
                Err(e) => warn!("authentication with {mechanism} failed: {e}"),
            }
        }
        Err(error::authentication())
    }

    /// Runs one AUTH exchange, answering 334 challenges until the server
    /// decides.
    fn try_auth(
        &mut self,
        mechanism: Mechanism,
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        let mut response = self.command(&Auth::new(mechanism, credentials)?)?;

        // Limit challenges to avoid blocking
        let mut challenges = 10;
        while response.has_code(334) {
            if challenges == 0 {
                return Err(error::response("unexpected number of challenges"));
            }
            challenges -= 1;
            let encoded = response
                .first_word()
                .ok_or_else(|| error::response("could not read auth challenge"))?;
            let decoded = String::from_utf8(BASE64.decode(encoded).map_err(error::response)?)
                .map_err(error::response)?;
            response = self.command(&AuthResponse::new(mechanism, credentials, &decoded)?)?;
        }
        Ok(response)
    }

    /// Runs one mail transaction: MAIL FROM, one RCPT TO per recipient,
    /// DATA with dot-stuffed content, then RSET so the connection is ready
    /// for the next transaction.
    ///
    /// Any rejected recipient aborts the whole transaction before DATA; no
    /// partial delivery is attempted. When `from` is `None` the sender
    /// falls back to the `SENDMAIL_FROM` environment variable, or
    /// `postmaster@localhost`.
    pub fn send<R: AsRef<str>>(
        &mut self,
        recipients: &[R],
        message: &[u8],
        from: Option<&str>,
    ) -> Result<(), Error> {
        let mut violations: Vec<String> = Vec::new();
        if recipients.is_empty()
            || recipients
                .iter()
                .any(|r| !validate::is_valid_email(r.as_ref()))
        {
            violations.push("invalid to address value".into());
        }
        let sender = match from {
            Some(addr) => {
                if !validate::is_valid_email(addr) {
                    violations.push("invalid from address value".into());
                }
                addr.to_string()
            }
            None => default_sender(),
        };
        if message.is_empty() {
            violations.push("invalid message value".into());
        }
        if !violations.is_empty() {
            return Err(error::invalid_argument(violations));
        }

        self.transcript.clear();
        self.command(&Mail::new(sender.as_str()))?;
        for recipient in recipients {
            self.command(&Rcpt::new(recipient.as_ref()))?;
        }
        self.command(&Data)?;
        self.message(message)?;
        self.command(&Rset)?;
        Ok(())
    }

    /// Sends the message content
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len());
        codec.encode(message, &mut out_buf);
        if !out_buf.ends_with(b"\r\n") {
            out_buf.extend_from_slice(b"\r\n");
        }
        self.write(&out_buf)?;
        self.write(b".\r\n")?;
        self.read_reply(Step::DataEnd, &[250])
    }

    /// Sends QUIT and waits for the goodbye reply.
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.transcript.clear();
        self.command(&Quit)
    }

    /// Best-effort QUIT, then closes the stream. Failures while closing are
    /// not reported; the stream is gone either way.
    pub fn disconnect(mut self) {
        self.abort();
    }

    /// Tears the connection down in place.
    pub fn abort(&mut self) {
        if !self.panic {
            let _ = self.write(Quit.to_string().as_bytes());
        }
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
        self.panic = true;
    }

    /// Whether the connection has seen an unrecoverable stream or framing
    /// error.
    pub fn has_broken(&self) -> bool {
        self.panic
    }

    /// Information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// The raw server replies recorded for the most recent operation.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Set timeout
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)
    }

    /// Sends an SMTP command and validates the reply against the command's
    /// expected codes.
    pub fn command<C: Command>(&mut self, command: &C) -> Result<Response, Error> {
        self.write(command.to_string().as_bytes())?;
        self.read_reply(command.step(), command.expected())
    }

    /// Writes a string to the server
    fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        if self.panic {
            return Err(error::invalid_state("connection is broken"));
        }
        let result = self
            .stream
            .get_mut()
            .write_all(string)
            .and_then(|()| self.stream.get_mut().flush());
        if let Err(e) = result {
            self.panic = true;
            return Err(error::network(e));
        }

        debug!("Wrote: {}", escape_crlf(&String::from_utf8_lossy(string)));
        Ok(())
    }

    /// Reads one reply, records it, and checks its code against `expected`.
    fn read_reply(&mut self, step: Step, expected: &[u16]) -> Result<Response, Error> {
        let response = self.read_response()?;
        let lines = response.raw_lines();
        self.transcript.record(step, lines.clone());
        if expected.contains(&response.code().value()) {
            Ok(response)
        } else {
            Err(error::code(response.code(), lines))
        }
    }

    /// Reads lines until a complete (possibly multi-line) reply is parsed.
    fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        loop {
            let read = match self.stream.read_line(&mut buffer) {
                Ok(read) => read,
                Err(e) => {
                    self.panic = true;
                    return Err(error::network(e));
                }
            };
            if read == 0 {
                break;
            }
            debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => return Ok(response),
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(e)) | Err(nom::Err::Error(e)) => {
                    self.panic = true;
                    return Err(error::response(format!("{e:?}")));
                }
            }
        }

        self.panic = true;
        Err(error::network(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before a complete reply",
        )))
    }
}

fn default_sender() -> String {
    match std::env::var("SENDMAIL_FROM") {
        Ok(from) if validate::is_valid_email(&from) => from,
        _ => "postmaster@localhost".to_string(),
    }
}
