//! Line-level encoding primitives: quoted-printable, base64 wrapping, line
//! ending normalization and word wrapping.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::mime::error::Error;

/// Default maximum line length for encoded output.
pub const DEFAULT_LINE_LENGTH: usize = 72;

/// The line ending used on the wire.
pub const CRLF: &str = "\r\n";

/// Whether `byte` must be escaped in quoted-printable output.
///
/// The escape set is the control and high-bit range (0x00-0x1F, 0x7F-0xFF);
/// the literal `=` is escaped separately.
fn needs_escape(byte: u8) -> bool {
    byte <= 0x1f || byte >= 0x7f
}

/// Tells whether `text` contains no byte needing a quoted-printable escape.
pub fn is_printable(text: &str) -> bool {
    text.bytes().all(|b| !needs_escape(b))
}

/// Encodes `text` as quoted-printable, folding so that no output line exceeds
/// `line_length` columns.
///
/// An escape triplet is never split across a fold, a trailing space before a
/// fold is written as `=20`, and every segment but the last of a logical line
/// carries the `=` soft-break marker. Empty input lines pass through
/// unchanged.
pub fn quoted_printable_encode(
    text: &str,
    line_length: usize,
    line_ending: &str,
) -> Result<String, Error> {
    if line_length <= 1 {
        return Err(Error::invalid_argument(vec!["invalid line length value"]));
    }
    if text.is_empty() {
        return Ok(String::new());
    }

    let mut out = Vec::new();
    for line in text.split(line_ending) {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut escaped = String::with_capacity(line.len());
        for byte in line.bytes() {
            if byte == b'=' {
                escaped.push_str("=3D");
            } else if needs_escape(byte) {
                escaped.push_str(&format!("={:02X}", byte));
            } else {
                escaped.push(byte as char);
            }
        }

        // Fold the escaped line token by token (a token is one character or
        // a whole =XX escape), so a triplet never straddles a fold. A chunk
        // always takes at least one token, even at degenerate widths.
        let bytes = escaped.as_bytes();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < bytes.len() {
            let mut end = start;
            loop {
                let token = if bytes[end] == b'=' { 3 } else { 1 };
                if end + token - start > line_length && end > start {
                    break;
                }
                end += token;
                if end >= bytes.len() {
                    break;
                }
            }
            chunks.push(&escaped[start..end]);
            start = end;
        }

        let count = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut segment = match chunk.strip_suffix(' ') {
                Some(head) => format!("{}=20", head),
                None => chunk.to_string(),
            };
            if i + 1 < count {
                segment.push('=');
            }
            out.push(segment);
        }
    }
    Ok(out.join(line_ending))
}

/// Decodes quoted-printable `text` back into bytes.
///
/// Tolerant by design: soft line breaks (`=` before CRLF or LF) disappear,
/// `=XX` escapes become the named byte, and malformed escapes pass through
/// as literal text.
pub fn quoted_printable_decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }
        match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&h1), Some(&h2)) => match (hex_value(h1), hex_value(h2)) {
                (Some(v1), Some(v2)) => {
                    out.push(v1 << 4 | v2);
                    i += 3;
                }
                _ => {
                    out.push(b);
                    i += 1;
                }
            },
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Base64-encodes `data` and hard-wraps the output at `line_length` columns.
pub fn base64_chunked(data: &[u8], line_length: usize, line_ending: &str) -> String {
    let encoded = BASE64.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / line_length.max(1) * 2);
    let mut rest = encoded.as_str();
    while rest.len() > line_length {
        let (head, tail) = rest.split_at(line_length);
        out.push_str(head);
        out.push_str(line_ending);
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Normalizes any mix of CRLF / CR / LF line endings in `text` to
/// `line_ending`.
pub fn normalize_eol(text: &str, line_ending: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    if line_ending == "\n" {
        unified
    } else {
        unified.replace('\n', line_ending)
    }
}

/// Wraps `text` at `width` columns, breaking on spaces where possible and
/// cutting words longer than a whole line.
pub fn word_wrap(text: &str, width: usize, line_ending: &str) -> String {
    let mut out = Vec::new();
    for line in text.split(line_ending) {
        if line.len() <= width {
            out.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split(' ') {
            let mut word = word;
            // force-break words that can never fit
            while word.len() > width {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                let (head, tail) = word.split_at(floor_char_boundary(word, width));
                out.push(head.to_string());
                word = tail;
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.len() + 1 + word.len() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        out.push(current);
    }
    out.join(line_ending)
}

/// Largest index `<= at` that lies on a UTF-8 character boundary of `s`.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut i = at.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn qp_plain_ascii_untouched() {
        assert_eq!(
            quoted_printable_encode("Hello, world!", 72, CRLF).unwrap(),
            "Hello, world!"
        );
    }

    #[test]
    fn qp_escapes_equals_and_high_bit() {
        assert_eq!(
            quoted_printable_encode("a=b", 72, CRLF).unwrap(),
            "a=3Db"
        );
        assert_eq!(
            quoted_printable_encode("café", 72, CRLF).unwrap(),
            "caf=C3=A9"
        );
    }

    #[test]
    fn qp_folds_with_soft_breaks() {
        let encoded = quoted_printable_encode(&"x".repeat(100), 72, CRLF).unwrap();
        assert_eq!(
            encoded,
            format!("{}={}{}", "x".repeat(72), CRLF, "x".repeat(28))
        );
    }

    #[test]
    fn qp_never_splits_a_triplet() {
        // 71 plain characters put the escape right at the fold point
        let input = format!("{}é", "x".repeat(71));
        let encoded = quoted_printable_encode(&input, 72, CRLF).unwrap();
        for line in encoded.split(CRLF) {
            // no line may end mid-escape
            let trimmed = line.strip_suffix('=').unwrap_or(line);
            assert!(!trimmed.ends_with("=C") && !trimmed.ends_with("=3"), "{trimmed:?}");
        }
        assert_eq!(quoted_printable_decode(&encoded), input.as_bytes());
    }

    #[test]
    fn qp_trailing_space_becomes_escape() {
        assert_eq!(
            quoted_printable_encode("ends with space ", 72, CRLF).unwrap(),
            "ends with space=20"
        );
    }

    #[test]
    fn qp_empty_lines_pass_through() {
        assert_eq!(
            quoted_printable_encode("a\r\n\r\nb", 72, CRLF).unwrap(),
            "a\r\n\r\nb"
        );
    }

    #[test]
    fn qp_rejects_degenerate_line_length() {
        assert!(quoted_printable_encode("x", 1, CRLF).is_err());
        assert!(quoted_printable_encode("x", 0, CRLF).is_err());
    }

    #[test]
    fn qp_round_trip() {
        let samples: &[&str] = &[
            "plain text",
            "café crème über alles",
            "=== equals ===",
            "line one\r\nline two\r\n",
            "tab\there",
            "\u{1F4E7} mailbox",
        ];
        for sample in samples {
            for len in [4usize, 10, 72] {
                let encoded = quoted_printable_encode(sample, len, CRLF).unwrap();
                assert_eq!(
                    quoted_printable_decode(&encoded),
                    sample.as_bytes(),
                    "round trip failed for {sample:?} at {len}"
                );
            }
        }
    }

    #[test]
    fn qp_decode_tolerates_malformed_escapes() {
        assert_eq!(quoted_printable_decode("=XY"), b"=XY");
        assert_eq!(quoted_printable_decode("="), b"=");
        assert_eq!(quoted_printable_decode("a=\r\nb"), b"ab");
        assert_eq!(quoted_printable_decode("a=\nb"), b"ab");
    }

    #[test]
    fn base64_wraps_at_line_length() {
        let out = base64_chunked(&[0u8; 80], 76, CRLF);
        assert_eq!(
            out,
            concat!(
                "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\r\n",
                "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
            )
        );
    }

    #[test]
    fn eol_normalization() {
        assert_eq!(normalize_eol("a\rb\nc\r\nd", CRLF), "a\r\nb\r\nc\r\nd");
        assert_eq!(normalize_eol("a\r\nb", "\n"), "a\nb");
    }

    #[test]
    fn word_wrap_breaks_on_spaces() {
        assert_eq!(
            word_wrap("the quick brown fox jumps", 10, CRLF),
            "the quick\r\nbrown fox\r\njumps"
        );
    }

    #[test]
    fn word_wrap_cuts_long_words() {
        assert_eq!(
            word_wrap("abcdefghijklmno", 5, CRLF),
            "abcde\r\nfghij\r\nklmno"
        );
    }

    #[test]
    fn printable_check() {
        assert!(is_printable("Just ASCII, with punctuation!"));
        assert!(!is_printable("café"));
        assert!(!is_printable("tab\there"));
    }
}
