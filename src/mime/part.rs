//! Building a single MIME body part from its descriptor.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::mime::encoding::{
    base64_chunked, normalize_eol, quoted_printable_encode, word_wrap, CRLF, DEFAULT_LINE_LENGTH,
};
use crate::mime::error::Error;

/// Default MIME type for a part.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Default charset for part content.
pub const DEFAULT_CONTENT_CHARSET: &str = "us-ascii";

/// A `Content-Transfer-Encoding` value.
///
/// The set is closed: any other token is rejected when parsing rather than
/// coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// `7bit`
    SevenBit,
    /// `8bit`
    EightBit,
    /// `quoted-printable`
    QuotedPrintable,
    /// `base64`
    Base64,
    /// `binary`
    Binary,
}

impl Display for TransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::QuotedPrintable => "quoted-printable",
            TransferEncoding::Base64 => "base64",
            TransferEncoding::Binary => "binary",
        })
    }
}

impl FromStr for TransferEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "7bit" => Ok(TransferEncoding::SevenBit),
            "8bit" => Ok(TransferEncoding::EightBit),
            "quoted-printable" => Ok(TransferEncoding::QuotedPrintable),
            "base64" => Ok(TransferEncoding::Base64),
            "binary" => Ok(TransferEncoding::Binary),
            _ => Err(Error::invalid_argument(vec!["invalid encoding value"])),
        }
    }
}

/// A `Content-Disposition` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Rendered as part of the message body.
    Inline,
    /// Offered as a downloadable file.
    Attachment,
}

impl Display for Disposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        })
    }
}

impl FromStr for Disposition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(Disposition::Inline),
            "attachment" => Ok(Disposition::Attachment),
            _ => Err(Error::invalid_argument(vec!["invalid disposition value"])),
        }
    }
}

/// One rendered MIME part: a header block and its encoded content.
///
/// Produced by [`PartBuilder::build`] and consumed by
/// [`compose`][crate::mime::compose].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    /// The part's `Content-*` header block, without a trailing line ending.
    pub header: String,
    /// The encoded content.
    pub content: String,
}

/// Describes a part to build: content metadata plus encoding choices.
///
/// # Example
///
/// ```
/// use missive::mime::{PartBuilder, TransferEncoding, Disposition};
///
/// # fn main() -> Result<(), missive::mime::Error> {
/// let part = PartBuilder::new()
///     .mime_type("image/png")
///     .filename("logo.png")
///     .encoding(TransferEncoding::Base64)
///     .disposition(Disposition::Inline)
///     .content_id("logo@example")
///     .build(&b"\x89PNG..."[..])?;
/// assert!(part.header.contains("Content-ID: <logo@example>"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PartBuilder {
    mime_type: String,
    filename: Option<String>,
    charset: String,
    encoding: TransferEncoding,
    disposition: Disposition,
    content_id: Option<String>,
    line_length: usize,
    line_ending: String,
}

impl Default for PartBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PartBuilder {
    /// Creates a descriptor with the defaults: `application/octet-stream`,
    /// `us-ascii`, quoted-printable, inline, 72-column lines, CRLF endings.
    pub fn new() -> Self {
        PartBuilder {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            filename: None,
            charset: DEFAULT_CONTENT_CHARSET.to_string(),
            encoding: TransferEncoding::QuotedPrintable,
            disposition: Disposition::Inline,
            content_id: None,
            line_length: DEFAULT_LINE_LENGTH,
            line_ending: CRLF.to_string(),
        }
    }

    /// Sets the MIME type (`type/subtype`).
    pub fn mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Sets the filename, emitted as both the `name=` and `filename=`
    /// parameters.
    pub fn filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the content charset.
    pub fn charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets the transfer encoding.
    pub fn encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the content disposition.
    pub fn disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Sets the `Content-ID`, without its angle brackets.
    pub fn content_id<S: Into<String>>(mut self, content_id: S) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Sets the maximum encoded line length.
    pub fn line_length(mut self, line_length: usize) -> Self {
        self.line_length = line_length;
        self
    }

    /// Renders the part: headers plus content encoded per the configured
    /// transfer encoding.
    ///
    /// Every invalid field is reported, not just the first one found.
    pub fn build<C: AsRef<[u8]>>(self, content: C) -> Result<MessagePart, Error> {
        let content = content.as_ref();
        let mut violations: Vec<String> = Vec::new();

        if content.is_empty() {
            violations.push("invalid content value".into());
        }
        let mime_type = strip_line_noise(&self.mime_type);
        let mime_type = mime_type.trim();
        if mime_type.len() < 4 || !looks_like_mime_type(mime_type) {
            violations.push("invalid type value".into());
        }
        let filename = match &self.filename {
            Some(raw) => {
                let cleaned = strip_line_noise(raw);
                let cleaned = cleaned.trim().to_string();
                if cleaned.is_empty() {
                    violations.push("invalid name value".into());
                }
                Some(cleaned)
            }
            None => None,
        };
        if !(self.charset.len() >= 2
            && self
                .charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-'))
        {
            violations.push("invalid charset value".into());
        }
        let content_id = match &self.content_id {
            Some(raw) => {
                let cleaned: String = raw
                    .chars()
                    .filter(|c| !matches!(c, '\r' | '\n' | '\t' | ' '))
                    .collect();
                if cleaned.is_empty() {
                    violations.push("invalid id value".into());
                }
                Some(cleaned)
            }
            None => None,
        };
        if self.line_length <= 1 {
            violations.push("invalid line length value".into());
        }

        // text-shaped encodings work on lines, so the input has to be text
        let text = match self.encoding {
            TransferEncoding::Base64 => None,
            _ => match std::str::from_utf8(content) {
                Ok(text) => Some(text),
                Err(_) => {
                    violations.push(format!(
                        "invalid content value: {} content must be valid UTF-8",
                        self.encoding
                    ));
                    None
                }
            },
        };

        if !violations.is_empty() {
            return Err(Error::InvalidArgument(violations));
        }

        let end = &self.line_ending;
        let mut header = format!(
            "Content-Type: {};{}\tcharset=\"{}\"",
            mime_type, end, self.charset
        );
        if let Some(name) = &filename {
            header.push_str(&format!(";{}\tname=\"{}\"", end, name));
        }
        header.push_str(&format!("{}Content-Transfer-Encoding: {}", end, self.encoding));
        header.push_str(&format!("{}Content-Disposition: {}", end, self.disposition));
        if let Some(name) = &filename {
            header.push_str(&format!(";{}\tfilename=\"{}\"", end, name));
        }
        if let Some(id) = &content_id {
            header.push_str(&format!("{}Content-ID: <{}>", end, id));
        }

        let content = match self.encoding {
            TransferEncoding::SevenBit | TransferEncoding::EightBit => {
                let text = text.unwrap_or_default();
                word_wrap(&normalize_eol(text, end), self.line_length, end)
            }
            TransferEncoding::Base64 => base64_chunked(content, self.line_length, end),
            TransferEncoding::QuotedPrintable => {
                let text = text.unwrap_or_default();
                quoted_printable_encode(&normalize_eol(text, end), self.line_length, end)?
            }
            TransferEncoding::Binary => text.unwrap_or_default().to_string(),
        };

        Ok(MessagePart { header, content })
    }
}

fn strip_line_noise(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\r' | '\n' | '\t')).collect()
}

fn looks_like_mime_type(s: &str) -> bool {
    let mut parts = s.splitn(2, '/');
    matches!(
        (parts.next(), parts.next()),
        (Some(main), Some(sub)) if !main.is_empty() && !sub.is_empty()
    )
}

/// Guesses a MIME type from a filename extension, defaulting to
/// `application/octet-stream`.
pub fn mime_type_for_filename(filename: &str) -> &'static str {
    let name = filename.trim();
    let mut parts: Vec<&str> = name.rsplitn(2, '.').collect();
    parts.reverse();
    let extension = match parts.as_slice() {
        [stem, extension] if !stem.trim().is_empty() => extension.to_ascii_lowercase(),
        _ => return DEFAULT_MIME_TYPE,
    };
    match extension.as_str() {
        "bmp" => "image/bmp",
        "css" => "text/css",
        "gif" => "image/gif",
        "gz" => "application/x-gzip",
        "htm" | "html" => "text/html",
        "jpe" | "jpeg" | "jpg" => "image/jpeg",
        "js" => "application/x-javascript",
        "kar" | "mid" | "midi" => "audio/midi",
        "mov" | "qt" => "video/quicktime",
        "mp2" | "mp3" | "mpga" => "audio/mpeg",
        "mpe" | "mpeg" | "mpg" => "video/mpeg",
        "png" => "image/png",
        "tar" | "tgz" => "application/x-tar",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "vcf" => "text/x-vcard",
        "wav" => "audio/x-wav",
        "xml" => "text/xml",
        "zip" => "application/zip",
        _ => DEFAULT_MIME_TYPE,
    }
}
