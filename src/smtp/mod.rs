//! The SMTP transaction engine.
//!
//! A [`Connector`] holds the dial settings (port, timeouts, TLS mode,
//! credentials, EHLO name); [`Connector::connect`] turns them into an open
//! [`SmtpConnection`] after running the greeting, EHLO/HELO and AUTH steps.
//! One connection maps to exactly one TCP/TLS session and is driven strictly
//! sequentially; open one connection per server (or per recipient domain,
//! via [`Connector::connect_mx`]) and drive them from separate threads when
//! parallel delivery is wanted.
//!
//! ```rust,no_run
//! use missive::smtp::Connector;
//!
//! # fn main() -> Result<(), missive::smtp::Error> {
//! let mut conn = Connector::new()
//!     .credentials(("user", "secret"))
//!     .connect("mail.example.com")?;
//! conn.send(
//!     &["rcpt@example.org"],
//!     b"Subject: hello\r\n\r\nhello world\r\n",
//!     Some("sender@example.com"),
//! )?;
//! conn.disconnect();
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::warn;

pub mod authentication;
pub mod client;
pub mod commands;
mod error;
pub mod extension;
pub mod mx;
pub mod response;
pub mod transcript;

pub use self::authentication::{Credentials, Mechanism};
pub use self::client::{SmtpConnection, TlsMode, TlsParameters};
pub use self::error::Error;
pub use self::extension::{ClientId, ServerInfo};
pub use self::mx::{DnsMxResolver, MxResolver};
pub use self::response::{Code, Response, Severity};
pub use self::transcript::{Step, Transcript};

use crate::validate;

/// Default SMTP port.
pub const SMTP_PORT: u16 = 25;

/// Default connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default post-connect read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Dial settings for opening SMTP sessions.
///
/// A `Connector` is reusable: each [`connect`][Connector::connect] call
/// opens an independent session.
#[derive(Clone, Debug, Default)]
pub struct Connector {
    port: Option<u16>,
    timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    local_name: Option<String>,
    credentials: Option<Credentials>,
    mechanism: Option<Mechanism>,
    tls: Option<TlsMode>,
    tls_context: Option<native_tls::TlsConnector>,
}

impl Connector {
    /// Creates a connector with the defaults: port 25, 30 s connect
    /// timeout, 5 s read timeout, no TLS, no authentication, EHLO name
    /// `[127.0.0.1]`.
    pub fn new() -> Connector {
        Connector::default()
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Connector {
        self.port = Some(port);
        self
    }

    /// Sets the connect timeout.
    pub fn timeout(mut self, timeout: Duration) -> Connector {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-read timeout applied once the connection is up.
    pub fn read_timeout(mut self, read_timeout: Duration) -> Connector {
        self.read_timeout = Some(read_timeout);
        self
    }

    /// Sets the name presented in EHLO/HELO: `localhost`, an IPv4 literal
    /// or a hostname.
    pub fn local_name<S: Into<String>>(mut self, local_name: S) -> Connector {
        self.local_name = Some(local_name.into());
        self
    }

    /// Sets the credentials to authenticate with after the greeting.
    pub fn credentials<C: Into<Credentials>>(mut self, credentials: C) -> Connector {
        self.credentials = Some(credentials.into());
        self
    }

    /// Forces one authentication mechanism instead of negotiating.
    pub fn mechanism(mut self, mechanism: Mechanism) -> Connector {
        self.mechanism = Some(mechanism);
        self
    }

    /// Wraps the connection in TLS from the start, using the given dial
    /// scheme.
    pub fn tls(mut self, mode: TlsMode) -> Connector {
        self.tls = Some(mode);
        self
    }

    /// Supplies a pre-built TLS connector (certificate pinning, custom
    /// roots). Implies nothing by itself: TLS is still switched on with
    /// [`tls`][Connector::tls].
    pub fn tls_context(mut self, context: native_tls::TlsConnector) -> Connector {
        self.tls_context = Some(context);
        self
    }

    /// Opens a session to `host` and runs the full handshake.
    ///
    /// All parameters are validated before any I/O; every violation found
    /// is reported in one error.
    pub fn connect(&self, host: &str) -> Result<SmtpConnection, Error> {
        let host = host.trim().to_ascii_lowercase();

        let mut violations: Vec<String> = Vec::new();
        if !validate::is_valid_host(&host) {
            violations.push("invalid host value".into());
        }
        let port = self.port.unwrap_or(SMTP_PORT);
        if port == 0 {
            violations.push("invalid port value".into());
        }
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            violations.push("invalid timeout value".into());
        }
        let local_name = match &self.local_name {
            Some(name) => match name.parse::<ClientId>() {
                Ok(client_id) => client_id,
                Err(_) => {
                    violations.push("invalid name value".into());
                    ClientId::default()
                }
            },
            None => ClientId::default(),
        };
        if let Some(credentials) = &self.credentials {
            if credentials.username().trim().is_empty() {
                violations.push("invalid username value".into());
            }
            if credentials.secret().is_empty() {
                violations.push("invalid password value".into());
            }
        }
        if !violations.is_empty() {
            return Err(error::invalid_argument(violations));
        }

        let tls = match self.tls {
            Some(mode) => Some(TlsParameters::new(
                mode,
                self.tls_context.clone(),
                host.clone(),
            )?),
            None => None,
        };

        SmtpConnection::connect(
            &host,
            port,
            timeout,
            self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            tls.as_ref(),
            &local_name,
            self.credentials.as_ref(),
            self.mechanism,
        )
    }

    /// Resolves `domain`'s MX records with the default DNS resolver and
    /// connects to the best exchanger that answers, falling back to the
    /// domain itself as a last resort.
    pub fn connect_mx(&self, domain: &str) -> Result<SmtpConnection, Error> {
        let resolver = DnsMxResolver::new()?;
        self.connect_mx_with(domain, &resolver)
    }

    /// Same as [`connect_mx`][Connector::connect_mx] with a caller-supplied
    /// resolver.
    pub fn connect_mx_with(
        &self,
        domain: &str,
        resolver: &dyn MxResolver,
    ) -> Result<SmtpConnection, Error> {
        let domain = domain.trim().to_ascii_lowercase();
        if !validate::is_valid_hostname(&domain) {
            return Err(error::invalid_argument(vec!["invalid host value"]));
        }

        match resolver.resolve_mx(&domain) {
            Ok(hosts) => {
                for host in hosts {
                    match self.connect(&host) {
                        Ok(conn) => return Ok(conn),
                        Err(e) => warn!("MX candidate {host} failed: {e}"),
                    }
                }
            }
            Err(e) => warn!("MX resolution for {domain} failed: {e}"),
        }

        // no exchanger answered: the domain itself is the last resort
        self.connect(&domain)
    }
}

#[cfg(test)]
mod test {
    use super::mx::test_support::StaticResolver;
    use super::*;

    #[test]
    fn connect_validates_everything_at_once() {
        let err = Connector::new()
            .port(0)
            .timeout(Duration::from_secs(0))
            .local_name("not a name")
            .credentials(("", ""))
            .connect("bad host")
            .unwrap_err();
        assert_eq!(
            err.violations().unwrap(),
            [
                "invalid host value",
                "invalid port value",
                "invalid timeout value",
                "invalid name value",
                "invalid username value",
                "invalid password value",
            ]
        );
    }

    #[test]
    fn connect_accepts_localhost_and_literals() {
        // validation passes and the failure is the refused connection
        let err = Connector::new()
            .port(1)
            .timeout(Duration::from_millis(200))
            .connect("127.0.0.1")
            .unwrap_err();
        assert!(err.is_network(), "{err:?}");
    }

    #[test]
    fn connect_mx_rejects_bad_domain() {
        let resolver = StaticResolver(vec![]);
        let err = Connector::new()
            .connect_mx_with("not a domain", &resolver)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn connect_mx_falls_back_to_bare_domain() {
        // every candidate (including the fallback) refuses; the point is
        // that the error comes from the bare-domain attempt, not resolution
        let resolver = StaticResolver(vec![]);
        let err = Connector::new()
            .port(1)
            .timeout(Duration::from_millis(200))
            .connect_mx_with("invalid.invalid", &resolver)
            .unwrap_err();
        assert!(err.is_network(), "{err:?}");
    }
}
