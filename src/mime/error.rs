//! Error and result type for message composition

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// An enum of all composition error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// One or more arguments failed validation.
    ///
    /// Carries every violation found, not just the first: the composer checks
    /// all fields of its input before reporting.
    InvalidArgument(Vec<String>),
    /// The requested operation does not make sense in the current state,
    /// e.g. composing a message with no body set.
    InvalidState(&'static str),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(violations: Vec<S>) -> Error {
        Error::InvalidArgument(violations.into_iter().map(Into::into).collect())
    }

    /// The list of validation failures, when the error is an argument error.
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            Error::InvalidArgument(violations) => Some(violations),
            Error::InvalidState(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(violations) => write!(f, "{}", violations.join(", ")),
            Error::InvalidState(message) => f.write_str(message),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn display_joins_violations() {
        let error = Error::invalid_argument(vec!["invalid charset value", "invalid name value"]);
        assert_eq!(error.to_string(), "invalid charset value, invalid name value");
        assert_eq!(error.violations().unwrap().len(), 2);
    }
}
