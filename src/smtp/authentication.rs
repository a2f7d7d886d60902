//! SASL authentication mechanisms for SMTP AUTH.

use std::fmt::{self, Debug, Display, Formatter, Write as _};
use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;

use crate::smtp::error::{self, Error};

/// Fallback order used when negotiating a mechanism with the server.
pub const MECHANISM_FALLBACK_ORDER: &[Mechanism] =
    &[Mechanism::Login, Mechanism::Plain, Mechanism::CramMd5];

/// Contains user credentials
#[derive(PartialEq, Eq, Clone)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            username,
            secret: password,
        }
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Supported authentication mechanisms.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum Mechanism {
    /// LOGIN: the server prompts for username and password in turn.
    /// Obsolete but still the most widely deployed.
    Login,
    /// PLAIN ([RFC 4616](https://tools.ietf.org/html/rfc4616)): everything in
    /// one initial response.
    Plain,
    /// CRAM-MD5 ([RFC 2195](https://tools.ietf.org/html/rfc2195)):
    /// challenge-response with a keyed MD5 digest.
    CramMd5,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Login => "LOGIN",
            Mechanism::Plain => "PLAIN",
            Mechanism::CramMd5 => "CRAM-MD5",
        })
    }
}

impl FromStr for Mechanism {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "login" => Ok(Mechanism::Login),
            "plain" => Ok(Mechanism::Plain),
            "cram-md5" => Ok(Mechanism::CramMd5),
            _ => Err(error::invalid_argument(vec![
                "invalid authentication type value",
            ])),
        }
    }
}

impl Mechanism {
    /// Does the mechanism support sending its response with the AUTH command
    /// itself.
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain => true,
            Mechanism::Login | Mechanism::CramMd5 => false,
        }
    }

    /// Returns the string to send to the server, using the provided username,
    /// password and challenge in some cases
    pub fn response(
        self,
        credentials: &Credentials,
        challenge: Option<&str>,
    ) -> Result<String, Error> {
        match self {
            Mechanism::Plain => match challenge {
                Some(_) => Err(error::response("this mechanism does not expect a challenge")),
                None => Ok(format!(
                    "{}\u{0}{}\u{0}{}",
                    credentials.username, credentials.username, credentials.secret
                )),
            },
            Mechanism::Login => {
                let decoded_challenge = challenge
                    .ok_or_else(|| error::response("this mechanism does expect a challenge"))?;

                if ["User Name", "Username:", "Username"].contains(&decoded_challenge) {
                    return Ok(credentials.username.clone());
                }

                if ["Password", "Password:"].contains(&decoded_challenge) {
                    return Ok(credentials.secret.clone());
                }

                Err(error::response("unrecognized challenge"))
            }
            Mechanism::CramMd5 => {
                let challenge = challenge
                    .ok_or_else(|| error::response("this mechanism does expect a challenge"))?;

                let mut mac = Hmac::<Md5>::new_from_slice(credentials.secret.as_bytes())
                    .map_err(|_| error::response("invalid HMAC key"))?;
                mac.update(challenge.as_bytes());
                let digest = mac.finalize().into_bytes();

                let mut hex = String::with_capacity(digest.len() * 2);
                for byte in digest {
                    let _ = write!(hex, "{:02x}", byte);
                }
                Ok(format!("{} {}", credentials.username, hex))
            }
        }
    }
}
