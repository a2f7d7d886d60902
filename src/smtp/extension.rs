//! EHLO capability handling.

use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::smtp::authentication::Mechanism;
use crate::smtp::error::{self, Error};
use crate::smtp::response::Response;
use crate::validate;

/// Client identifier, the parameter to `EHLO`/`HELO`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ClientId {
    /// A fully-qualified domain name (or `localhost`).
    Domain(String),
    /// An IPv4 address literal.
    Ipv4(Ipv4Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    fn default() -> Self {
        LOCALHOST_CLIENT
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(value) => f.write_str(value),
            Self::Ipv4(value) => write!(f, "[{}]", value),
        }
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(addr) = name.parse::<Ipv4Addr>() {
            return Ok(ClientId::Ipv4(addr));
        }
        if name == "localhost" || validate::is_valid_hostname(&name) {
            return Ok(ClientId::Domain(name));
        }
        Err(error::invalid_argument(vec!["invalid name value"]))
    }
}

/// What the server told us about itself in its EHLO reply.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// The name given in the server banner.
    name: String,
    /// AUTH mechanisms the server advertised, in advertisement order.
    auth_mechanisms: Vec<Mechanism>,
    /// The mechanism the server singled out with an `AUTH=` line, if any.
    default_mechanism: Option<Mechanism>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} with AUTH {:?}", self.name, self.auth_mechanisms)
    }
}

impl ServerInfo {
    /// Parses an EHLO reply into a `ServerInfo`.
    ///
    /// Both the standard `AUTH <mech>...` capability line and the legacy
    /// `AUTH=<mech>` default advertisement are recognized.
    pub fn from_response(response: &Response) -> Result<ServerInfo, Error> {
        let name = match response.first_word() {
            Some(name) => name.to_string(),
            None => return Err(error::response("could not read server name")),
        };

        let mut auth_mechanisms = Vec::new();
        let mut default_mechanism = None;

        for line in response.message() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("AUTH") => {
                    for token in tokens {
                        if let Ok(mechanism) = token.parse::<Mechanism>() {
                            if !auth_mechanisms.contains(&mechanism) {
                                auth_mechanisms.push(mechanism);
                            }
                        }
                    }
                }
                Some(token) if token.len() > 5 && token.starts_with("AUTH=") => {
                    if let Ok(mechanism) = token["AUTH=".len()..].parse::<Mechanism>() {
                        default_mechanism = Some(mechanism);
                    }
                }
                _ => {}
            }
        }

        Ok(ServerInfo {
            name,
            auth_mechanisms,
            default_mechanism,
        })
    }

    /// Checks if the server advertised the given AUTH mechanism.
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.auth_mechanisms.contains(&mechanism)
            || self.default_mechanism == Some(mechanism)
    }

    /// The advertised mechanisms, in advertisement order.
    pub fn auth_mechanisms(&self) -> &[Mechanism] {
        &self.auth_mechanisms
    }

    /// The mechanism the server advertised as its default, if any.
    pub fn default_mechanism(&self) -> Option<Mechanism> {
        self.default_mechanism
    }

    /// The name given in the server banner
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::smtp::response::Code;

    fn ehlo_response(lines: &[&str]) -> Response {
        Response::new(
            Code::new(250),
            lines.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(ClientId::Domain("test.example.org".into()).to_string(), "test.example.org");
        assert_eq!(LOCALHOST_CLIENT.to_string(), "[127.0.0.1]");
    }

    #[test]
    fn test_clientid_parse() {
        assert_eq!(
            "Mail.Example.ORG".parse::<ClientId>().unwrap(),
            ClientId::Domain("mail.example.org".into())
        );
        assert_eq!(
            "10.1.2.3".parse::<ClientId>().unwrap(),
            ClientId::Ipv4("10.1.2.3".parse().unwrap())
        );
        assert_eq!(
            "localhost".parse::<ClientId>().unwrap(),
            ClientId::Domain("localhost".into())
        );
        assert!("not a name".parse::<ClientId>().is_err());
    }

    #[test]
    fn test_serverinfo_auth_line() {
        let info = ServerInfo::from_response(&ehlo_response(&[
            "mail.example.org ready",
            "8BITMIME",
            "AUTH LOGIN PLAIN CRAM-MD5 XOAUTH2",
            "SIZE 42",
        ]))
        .unwrap();

        assert_eq!(info.name(), "mail.example.org");
        assert_eq!(
            info.auth_mechanisms(),
            [Mechanism::Login, Mechanism::Plain, Mechanism::CramMd5]
        );
        assert!(info.supports_auth_mechanism(Mechanism::Plain));
        assert_eq!(info.default_mechanism(), None);
    }

    #[test]
    fn test_serverinfo_default_line() {
        let info = ServerInfo::from_response(&ehlo_response(&[
            "mail.example.org",
            "AUTH=PLAIN",
        ]))
        .unwrap();

        assert!(info.auth_mechanisms().is_empty());
        assert_eq!(info.default_mechanism(), Some(Mechanism::Plain));
        assert!(info.supports_auth_mechanism(Mechanism::Plain));
    }

    #[test]
    fn test_serverinfo_no_auth() {
        let info = ServerInfo::from_response(&ehlo_response(&["mail.example.org", "8BITMIME"]))
            .unwrap();
        assert!(info.auth_mechanisms().is_empty());
        assert!(!info.supports_auth_mechanism(Mechanism::Login));
    }

    #[test]
    fn test_serverinfo_empty_reply() {
        let response = Response::new(Code::new(250), vec![]);
        assert!(ServerInfo::from_response(&response).is_err());
    }
}
