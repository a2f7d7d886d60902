//! MIME message composition.
//!
//! Builds RFC 2045/2047/2049 conformant header blocks and bodies: encoded
//! header words, transfer-encoded part content, and single-part or nested
//! multipart structures. Everything here is pure — no I/O, no shared state —
//! so it is safe to call from any number of threads at once.
//!
//! The typical flow is [`PartBuilder`] for each body/attachment, then
//! [`compose`] to assemble the final `(header, content)` pair:
//!
//! ```
//! use missive::mime::{compose, Disposition, PartBuilder, TransferEncoding};
//!
//! # fn main() -> Result<(), missive::mime::Error> {
//! let text = PartBuilder::new()
//!     .mime_type("text/plain")
//!     .charset("utf-8")
//!     .build("See attachment.")?;
//! let report = PartBuilder::new()
//!     .mime_type("application/zip")
//!     .filename("report.zip")
//!     .encoding(TransferEncoding::Base64)
//!     .disposition(Disposition::Attachment)
//!     .build(&b"PK..."[..])?;
//!
//! let message = compose(Some(&text), None, &[report])?;
//! assert!(message.header.contains("multipart/mixed"));
//! # Ok(())
//! # }
//! ```

mod compose;
mod encoding;
mod error;
mod header;
mod part;

pub use self::compose::{compose, ComposedMessage};
pub use self::encoding::{
    base64_chunked, is_printable, normalize_eol, quoted_printable_decode, quoted_printable_encode,
    word_wrap, CRLF, DEFAULT_LINE_LENGTH,
};
pub use self::error::Error;
pub use self::header::{
    decode_header_word, encode_header_word, DecodedWord, HeaderEncoding, DEFAULT_HEADER_CHARSET,
    DEFAULT_HEADER_LINE_LENGTH,
};
pub use self::part::{
    mime_type_for_filename, Disposition, MessagePart, PartBuilder, TransferEncoding,
    DEFAULT_CONTENT_CHARSET, DEFAULT_MIME_TYPE,
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Decodes part content according to its declared transfer encoding.
///
/// Base64 input may contain line breaks and surrounding whitespace. An
/// unknown or absent encoding passes the content through unchanged, as for
/// `7bit`.
pub fn decode_body(content: &str, encoding: Option<TransferEncoding>) -> Result<Vec<u8>, Error> {
    match encoding {
        Some(TransferEncoding::Base64) => {
            let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64
                .decode(stripped)
                .map_err(|_| Error::invalid_argument(vec!["invalid base64 content"]))
        }
        Some(TransferEncoding::QuotedPrintable) => Ok(quoted_printable_decode(content)),
        _ => Ok(content.as_bytes().to_vec()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_body_base64() {
        assert_eq!(
            decode_body("SGVs\r\nbG8=", Some(TransferEncoding::Base64)).unwrap(),
            b"Hello"
        );
        assert!(decode_body("not base64!!!", Some(TransferEncoding::Base64)).is_err());
    }

    #[test]
    fn decode_body_quoted_printable() {
        assert_eq!(
            decode_body("caf=C3=A9", Some(TransferEncoding::QuotedPrintable)).unwrap(),
            "café".as_bytes()
        );
    }

    #[test]
    fn decode_body_passthrough() {
        assert_eq!(decode_body("as-is", None).unwrap(), b"as-is");
        assert_eq!(
            decode_body("as-is", Some(TransferEncoding::SevenBit)).unwrap(),
            b"as-is"
        );
    }
}
