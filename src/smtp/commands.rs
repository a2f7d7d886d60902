//! SMTP commands

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::smtp::authentication::{Credentials, Mechanism};
use crate::smtp::error::Error;
use crate::smtp::extension::ClientId;
use crate::smtp::transcript::Step;

/// A single SMTP command: how it is written on the wire, which transcript
/// step it belongs to, and which reply codes count as success.
pub trait Command: Display {
    /// The transcript step recorded for this command's reply.
    fn step(&self) -> Step;
    /// The 1-2 reply codes accepted for this command.
    fn expected(&self) -> &'static [u16];
}

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

impl Command for Ehlo {
    fn step(&self) -> Step {
        Step::Ehlo
    }

    fn expected(&self) -> &'static [u16] {
        &[250]
    }
}

/// HELO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

impl Command for Helo {
    fn step(&self) -> Step {
        Step::Helo
    }

    fn expected(&self) -> &'static [u16] {
        &[250]
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: String,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>\r\n", self.sender)
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new<S: Into<String>>(sender: S) -> Mail {
        Mail {
            sender: sender.into(),
        }
    }
}

impl Command for Mail {
    fn step(&self) -> Step {
        Step::MailFrom
    }

    fn expected(&self) -> &'static [u16] {
        &[250]
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: String,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new<S: Into<String>>(recipient: S) -> Rcpt {
        Rcpt {
            recipient: recipient.into(),
        }
    }
}

impl Command for Rcpt {
    fn step(&self) -> Step {
        Step::RcptTo
    }

    // 251 means "will forward", which is still acceptance
    fn expected(&self) -> &'static [u16] {
        &[250, 251]
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

impl Command for Data {
    fn step(&self) -> Step {
        Step::Data
    }

    fn expected(&self) -> &'static [u16] {
        &[354]
    }
}

/// RSET command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Rset;

impl Display for Rset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("RSET\r\n")
    }
}

impl Command for Rset {
    fn step(&self) -> Step {
        Step::Rset
    }

    fn expected(&self) -> &'static [u16] {
        &[250]
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

impl Command for Quit {
    fn step(&self) -> Step {
        Step::Quit
    }

    fn expected(&self) -> &'static [u16] {
        &[221]
    }
}

/// AUTH command, initiating one mechanism.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Auth {
    mechanism: Mechanism,
    initial: Option<String>,
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.initial {
            Some(initial) => write!(f, "AUTH {} {}\r\n", self.mechanism, initial),
            None => write!(f, "AUTH {}\r\n", self.mechanism),
        }
    }
}

impl Auth {
    /// Creates an AUTH command, with the initial response inline when the
    /// mechanism supports one.
    pub fn new(mechanism: Mechanism, credentials: &Credentials) -> Result<Auth, Error> {
        let initial = if mechanism.supports_initial_response() {
            Some(BASE64.encode(mechanism.response(credentials, None)?))
        } else {
            None
        };
        Ok(Auth { mechanism, initial })
    }
}

impl Command for Auth {
    fn step(&self) -> Step {
        Step::Auth
    }

    // with an initial response the server decides immediately; otherwise it
    // must challenge first
    fn expected(&self) -> &'static [u16] {
        if self.initial.is_some() {
            &[235]
        } else {
            &[334]
        }
    }
}

/// A base64 reply to an AUTH challenge.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AuthResponse {
    payload: String,
}

impl Display for AuthResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.payload)
    }
}

impl AuthResponse {
    /// Builds the reply for `challenge` (already base64-decoded) using the
    /// given mechanism and credentials.
    pub fn new(
        mechanism: Mechanism,
        credentials: &Credentials,
        challenge: &str,
    ) -> Result<AuthResponse, Error> {
        Ok(AuthResponse {
            payload: BASE64.encode(mechanism.response(credentials, Some(challenge))?),
        })
    }
}

impl Command for AuthResponse {
    fn step(&self) -> Step {
        Step::AuthChallenge
    }

    fn expected(&self) -> &'static [u16] {
        &[334, 235]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let id = ClientId::Domain("localhost".to_string());
        assert_eq!(format!("{}", Ehlo::new(id.clone())), "EHLO localhost\r\n");
        assert_eq!(format!("{}", Helo::new(id)), "HELO localhost\r\n");
        assert_eq!(
            format!("{}", Mail::new("test@example.com")),
            "MAIL FROM:<test@example.com>\r\n"
        );
        assert_eq!(
            format!("{}", Rcpt::new("test@example.com")),
            "RCPT TO:<test@example.com>\r\n"
        );
        assert_eq!(format!("{}", Data), "DATA\r\n");
        assert_eq!(format!("{}", Rset), "RSET\r\n");
        assert_eq!(format!("{}", Quit), "QUIT\r\n");

        let credentials = Credentials::new("user".to_string(), "password".to_string());
        assert_eq!(
            format!("{}", Auth::new(Mechanism::Plain, &credentials).unwrap()),
            "AUTH PLAIN dXNlcgB1c2VyAHBhc3N3b3Jk\r\n"
        );
        assert_eq!(
            format!("{}", Auth::new(Mechanism::Login, &credentials).unwrap()),
            "AUTH LOGIN\r\n"
        );
        assert_eq!(
            format!("{}", Auth::new(Mechanism::CramMd5, &credentials).unwrap()),
            "AUTH CRAM-MD5\r\n"
        );
        assert_eq!(
            format!(
                "{}",
                AuthResponse::new(Mechanism::Login, &credentials, "Username:").unwrap()
            ),
            "dXNlcg==\r\n"
        );
    }

    #[test]
    fn test_expected_codes() {
        let credentials = Credentials::new("user".to_string(), "password".to_string());
        assert_eq!(Rcpt::new("a@b.example").expected(), &[250, 251]);
        assert_eq!(Data.expected(), &[354]);
        assert_eq!(
            Auth::new(Mechanism::Plain, &credentials).unwrap().expected(),
            &[235]
        );
        assert_eq!(
            Auth::new(Mechanism::Login, &credentials).unwrap().expected(),
            &[334]
        );
    }
}
