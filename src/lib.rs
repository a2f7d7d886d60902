//! missive is a mail utility library: it builds MIME messages and delivers
//! them over SMTP.
//!
//! The crate is split in two halves that cooperate but do not depend on each
//! other's state:
//!
//! * [`mime`] — a pure composer. It encodes header text as RFC 2047 encoded
//!   words, encodes part content per its `Content-Transfer-Encoding`
//!   (7bit/8bit/quoted-printable/base64/binary), and assembles single-part or
//!   nested `multipart/alternative` / `related` / `mixed` structures with
//!   unique boundary tokens. Everything in it is a plain function over its
//!   inputs and safe to call concurrently.
//! * [`smtp`] — a blocking SMTP client. One [`smtp::SmtpConnection`] per
//!   TCP/TLS session, driven strictly command-by-command: connect, EHLO
//!   (falling back to HELO), optional AUTH (LOGIN/PLAIN/CRAM-MD5 with
//!   mechanism negotiation from the EHLO capability list), then any number of
//!   MAIL/RCPT/DATA transactions. Each connection keeps a
//!   [`smtp::Transcript`] of the raw server replies for diagnostics.
//!
//! # Example
//!
//! ```rust,no_run
//! use missive::mime::{compose, PartBuilder, TransferEncoding};
//! use missive::smtp::Connector;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = PartBuilder::new()
//!     .mime_type("text/plain")
//!     .charset("utf-8")
//!     .encoding(TransferEncoding::QuotedPrintable)
//!     .build("Hello from missive!")?;
//!
//! let message = compose(Some(&text), None, &[])?;
//!
//! let mut conn = Connector::new()
//!     .credentials(("user", "secret"))
//!     .connect("mail.example.com")?;
//! conn.send(&["someone@example.org"], &message.to_bytes(), Some("me@example.com"))?;
//! conn.disconnect();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod mime;
pub mod smtp;
pub mod validate;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
