//! Error and result type for the SMTP engine

use std::{error::Error as StdError, fmt};

use crate::smtp::response::{Code, Severity};
use crate::BoxError;

/// The errors that may occur while talking to an SMTP server.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Malformed input caught before any I/O; carries every violation found.
    InvalidArgument(Vec<String>),
    /// The server answered with a reply code outside the expected set, or
    /// with a reply that could not be parsed. Carries the raw reply lines.
    Protocol {
        code: Option<Code>,
        lines: Vec<String>,
    },
    /// Connect/read/write failure on the underlying stream.
    Network,
    /// TLS setup or handshake failure.
    Tls,
    /// Every attempted authentication mechanism was rejected.
    Authentication,
    /// The operation does not make sense in the current state.
    InvalidState(&'static str),
    /// MX resolution failure.
    Resolve,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the input was rejected before any I/O happened.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidArgument(_))
    }

    /// Returns true if a server reply was unexpected or unparseable.
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol { .. })
    }

    /// Returns true if the underlying transport failed.
    pub fn is_network(&self) -> bool {
        matches!(self.inner.kind, Kind::Network)
    }

    /// Returns true if the error came from TLS setup.
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if authentication was rejected by the server.
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if the error is caused by a timed-out operation.
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
                return matches!(
                    io_err.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                );
            }

            source = err.source();
        }

        false
    }

    /// Returns true if the server reply was a transient (4yz) failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.status().map(Code::severity),
            Some(Severity::TransientNegativeCompletion)
        )
    }

    /// Returns true if the server reply was a permanent (5yz) failure.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.status().map(Code::severity),
            Some(Severity::PermanentNegativeCompletion)
        )
    }

    /// The reply code, when the error was produced by a server reply.
    pub fn status(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Protocol { code, .. } => code,
            _ => None,
        }
    }

    /// The validation failures, when the input was rejected.
    pub fn violations(&self) -> Option<&[String]> {
        match &self.inner.kind {
            Kind::InvalidArgument(violations) => Some(violations),
            _ => None,
        }
    }

    /// The raw reply lines, when the error was produced by a server reply.
    pub fn response_lines(&self) -> Option<&[String]> {
        match &self.inner.kind {
            Kind::Protocol { lines, .. } => Some(lines),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("missive::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::InvalidArgument(violations) => {
                write!(f, "{}", violations.join(", "))?;
            }
            Kind::Protocol {
                code: Some(code),
                lines,
            } => {
                write!(f, "unexpected reply ({code})")?;
                if let Some(first) = lines.first() {
                    write!(f, ": {first}")?;
                }
            }
            Kind::Protocol { code: None, .. } => f.write_str("unparseable reply")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Tls => f.write_str("tls error")?,
            Kind::Authentication => f.write_str("authentication failed")?,
            Kind::InvalidState(message) => f.write_str(message)?,
            Kind::Resolve => f.write_str("MX resolution error")?,
        }

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}

pub(crate) fn invalid_argument<S: Into<String>>(violations: Vec<S>) -> Error {
    Error::new::<BoxError>(
        Kind::InvalidArgument(violations.into_iter().map(Into::into).collect()),
        None,
    )
}

pub(crate) fn code(code: Code, lines: Vec<String>) -> Error {
    Error::new::<BoxError>(
        Kind::Protocol {
            code: Some(code),
            lines,
        },
        None,
    )
}

pub(crate) fn response<E: Into<BoxError>>(e: E) -> Error {
    Error::new(
        Kind::Protocol {
            code: None,
            lines: Vec::new(),
        },
        Some(e),
    )
}

pub(crate) fn network<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Network, Some(e))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e))
}

pub(crate) fn authentication() -> Error {
    Error::new::<BoxError>(Kind::Authentication, None)
}

pub(crate) fn invalid_state(message: &'static str) -> Error {
    Error::new::<BoxError>(Kind::InvalidState(message), None)
}

pub(crate) fn resolve<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Resolve, Some(e))
}
