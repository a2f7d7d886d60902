//! SMTP reply parsing: a 3-digit code plus one or more text lines.
//!
//! A multi-line reply keeps going while the fourth character of a line is
//! `-`; the terminal line uses a space instead. Every line must repeat the
//! same code.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    result,
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::streaming::{tag, take_until, take_while_m_n},
    combinator::{complete, map, peek, verify},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::smtp::error::{self, Error};

/// Severity of a reply, from the first digit of its code.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yz
    PositiveCompletion,
    /// 3yz
    PositiveIntermediate,
    /// 4yz
    TransientNegativeCompletion,
    /// 5yz
    PermanentNegativeCompletion,
}

/// A 3-digit SMTP reply code.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code(u16);

impl Code {
    pub(crate) fn new(value: u16) -> Code {
        Code(value)
    }

    /// The numeric value, e.g. `250`.
    pub fn value(self) -> u16 {
        self.0
    }

    /// The reply's severity class.
    pub fn severity(self) -> Severity {
        match self.0 / 100 {
            2 => Severity::PositiveCompletion,
            3 => Severity::PositiveIntermediate,
            4 => Severity::TransientNegativeCompletion,
            _ => Severity::PermanentNegativeCompletion,
        }
    }

    /// Tells if the code is a positive (2yz or 3yz) reply.
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity(),
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// One complete SMTP reply: code plus the text of every line.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    code: Code,
    message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Response, Error> {
        parse_response(s)
            .map(|(_, r)| r)
            .map_err(|e| error::response(e.to_owned()))
    }
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// The reply code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        self.code.0 == code
    }

    /// Tells if the reply is positive.
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Returns only the first word of the message if possible
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// Message text, one entry per reply line.
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }

    /// The reply reassembled as raw protocol lines, for diagnostics.
    pub fn raw_lines(&self) -> Vec<String> {
        let last = self.message.len().saturating_sub(1);
        self.message
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let sep = if i < last { '-' } else { ' ' };
                format!("{}{}{}", self.code, sep, text)
            })
            .collect()
    }
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    map(
        verify(
            take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
            |digits: &str| matches!(digits.as_bytes()[0], b'2'..=b'5'),
        ),
        |digits: &str| Code(digits.parse().unwrap_or(0)),
    )(i)
}

pub(crate) fn parse_response(i: &str) -> IResult<&str, Response> {
    let (i, lines) = many0(tuple((
        parse_code,
        preceded(tag("-"), take_until("\r\n")),
        tag("\r\n"),
    )))(i)?;
    let (i, (last_code, last_line)) = tuple((
        parse_code,
        alt((
            preceded(tag(" "), take_until("\r\n")),
            map(peek(tag("\r\n")), |_| ""),
        )),
    ))(i)?;
    let (i, _) = complete(tag("\r\n"))(i)?;

    // Check that all codes are equal.
    if !lines.iter().all(|&(code, _, _)| code == last_code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            "",
            nom::error::ErrorKind::Not,
        )));
    }

    // Extract text from lines, and append last line.
    let mut lines: Vec<String> = lines.into_iter().map(|(_, text, _)| text.into()).collect();
    lines.push(last_line.into());

    Ok((
        i,
        Response {
            code: last_code,
            message: lines,
        },
    ))
}
