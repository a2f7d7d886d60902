//! RFC 2047 "encoded word" support for header values.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::mime::encoding::{is_printable, quoted_printable_decode, quoted_printable_encode};
use crate::mime::error::Error;

/// Default charset assumed for header text.
pub const DEFAULT_HEADER_CHARSET: &str = "utf-8";

/// Default maximum length for an encoded header line.
pub const DEFAULT_HEADER_LINE_LENGTH: usize = 72;

/// Encoding used inside an encoded word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEncoding {
    /// `Q` encoding: quoted-printable with header-specific extra escapes.
    QuotedPrintable,
    /// `B` encoding: base64.
    Base64,
}

/// One decoded segment of a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWord {
    /// The charset named by the encoded word, or the default charset for
    /// segments that were not encoded.
    pub charset: String,
    /// The decoded bytes, still in `charset`'s encoding.
    pub value: Vec<u8>,
}

fn is_token(s: &str, extra: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(c))
}

/// Encodes header `text` as one or more RFC 2047 encoded words
/// (`=?charset?Q?..?=` or `=?charset?B?..?=`), each fitting within
/// `max_line_length` including the charset/encoding wrapper.
///
/// Text that needs no escaping is not wrapped at all when quoted-printable is
/// requested: it is returned as-is, chunked to the line limit. Multiple words
/// are joined with a `line_ending` + TAB continuation fold. Empty input is
/// returned unchanged.
pub fn encode_header_word(
    text: &str,
    charset: &str,
    encoding: HeaderEncoding,
    max_line_length: usize,
    line_ending: &str,
) -> Result<String, Error> {
    let mut violations = Vec::new();
    if !(charset.len() >= 2 && is_token(charset, "-")) {
        violations.push("invalid charset value");
    }
    if max_line_length <= 1 {
        violations.push("invalid line length value");
    }
    if !violations.is_empty() {
        return Err(Error::invalid_argument(violations));
    }
    if text.is_empty() {
        return Ok(String::new());
    }

    // Room left for payload once the `=?charset?X??=` skeleton is accounted
    // for. A degenerate remainder falls back to the full line length.
    let overhead = charset.len() + 7;
    let available = max_line_length.saturating_sub(overhead);

    let encoded = match encoding {
        HeaderEncoding::QuotedPrintable => {
            if is_printable(text) {
                None
            } else {
                let chunk = if available > 6 { available - 4 } else { max_line_length };
                let encoded = quoted_printable_encode(text, chunk, line_ending)?;
                // header-word context: `?` and space need their own escapes,
                // and the soft-break markers separate words instead
                let encoded = encoded
                    .replace('?', "=3F")
                    .replace(' ', "_")
                    .replace(&format!("={}", line_ending), line_ending);
                Some(encoded)
            }
        }
        HeaderEncoding::Base64 => {
            let budget = if available > 3 { available } else { max_line_length };
            let chunk = raw_chunk_for_base64(budget);
            let mut lines = Vec::new();
            let mut rest = text;
            while !rest.is_empty() {
                let cut = floor_char_boundary(rest, chunk.min(rest.len()));
                let cut = if cut == 0 { next_char_boundary(rest) } else { cut };
                let (head, tail) = rest.split_at(cut);
                lines.push(BASE64.encode(head));
                rest = tail;
            }
            Some(lines.join(line_ending))
        }
    };

    let words: Vec<String> = match encoded {
        Some(encoded) => {
            let marker = match encoding {
                HeaderEncoding::Base64 => 'B',
                HeaderEncoding::QuotedPrintable => 'Q',
            };
            encoded
                .split(line_ending)
                .filter(|word| !word.is_empty())
                .map(|word| format!("=?{}?{}?{}?=", charset, marker, word))
                .collect()
        }
        // already printable: plain chunks, no wrapper
        None => {
            let mut chunks = Vec::new();
            let mut rest = text;
            while !rest.is_empty() {
                let cut = max_line_length.min(rest.len());
                let (head, tail) = rest.split_at(cut);
                chunks.push(head.to_string());
                rest = tail;
            }
            chunks
        }
    };

    Ok(words.join(&format!("{}\t", line_ending)))
}

/// Largest raw chunk size whose base64 expansion still fits in `budget`
/// columns.
fn raw_chunk_for_base64(budget: usize) -> usize {
    let mut size = budget;
    if size > 3 {
        let mut i = size;
        while i > 2 {
            if (i + 1).div_ceil(3) * 4 <= budget {
                size = i;
                break;
            }
            i -= 1;
        }
    }
    size.max(1)
}

fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut i = at.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(s: &str) -> usize {
    let mut i = 1;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i.min(s.len())
}

/// Decodes a header value into its encoded-word and plain segments.
///
/// Both `B`/`b` and `Q`/`q` markers are recognized; anything that is not a
/// well-formed encoded word passes through verbatim, tagged with the default
/// charset. A bare non-encoded value yields a single segment.
pub fn decode_header_word(text: &str) -> Vec<DecodedWord> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return vec![DecodedWord {
            charset: DEFAULT_HEADER_CHARSET.to_string(),
            value: Vec::new(),
        }];
    }

    let mut segments = Vec::new();
    let mut rest = cleaned;
    while !rest.is_empty() {
        match rest.find("=?") {
            Some(start) => {
                match parse_encoded_word(&rest[start..]) {
                    Some((word, consumed)) => {
                        push_plain(&mut segments, &rest[..start]);
                        if !word.value.is_empty() {
                            segments.push(word);
                        }
                        rest = &rest[start + consumed..];
                    }
                    None => {
                        // `=?` that does not open a valid word: keep scanning
                        // past it as plain text
                        match rest[start + 2..].find("=?") {
                            Some(next) => {
                                push_plain(&mut segments, &rest[..start + 2 + next]);
                                rest = &rest[start + 2 + next..];
                            }
                            None => {
                                push_plain(&mut segments, rest);
                                rest = "";
                            }
                        }
                    }
                }
            }
            None => {
                push_plain(&mut segments, rest);
                rest = "";
            }
        }
    }

    if segments.is_empty() {
        segments.push(DecodedWord {
            charset: DEFAULT_HEADER_CHARSET.to_string(),
            value: Vec::new(),
        });
    }
    segments
}

fn push_plain(segments: &mut Vec<DecodedWord>, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    segments.push(DecodedWord {
        charset: DEFAULT_HEADER_CHARSET.to_string(),
        value: text.as_bytes().to_vec(),
    });
}

/// Parses one encoded word at the start of `s`; returns the decoded word and
/// the number of bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(DecodedWord, usize)> {
    let body = s.strip_prefix("=?")?;
    let charset_end = body.find('?')?;
    let charset = &body[..charset_end];
    if charset.len() < 2 || !is_token(charset, "-") {
        return None;
    }
    let after_charset = &body[charset_end + 1..];
    let mut chars = after_charset.chars();
    let marker = chars.next()?;
    if !matches!(marker, 'B' | 'b' | 'Q' | 'q') || chars.next()? != '?' {
        return None;
    }
    let payload = &after_charset[2..];
    let payload_end = payload.find("?=")?;
    let payload = &payload[..payload_end];

    let value = match marker {
        'B' | 'b' => BASE64.decode(payload.trim()).ok()?,
        'Q' | 'q' => quoted_printable_decode(&payload.replace('_', " ")),
        _ => return None,
    };

    let consumed = 2 + charset_end + 1 + 2 + payload_end + 2;
    Some((
        DecodedWord {
            charset: charset.to_string(),
            value,
        },
        consumed,
    ))
}
