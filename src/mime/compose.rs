//! Assembling a complete message from its body parts.

use std::time::SystemTime;

use crate::mime::encoding::CRLF;
use crate::mime::error::Error;
use crate::mime::part::MessagePart;

/// Human-readable line emitted before the first boundary of a multipart
/// body, for readers that do not understand MIME.
const PREAMBLE: &str =
    "This is a message in MIME Format. If you see this, your mail reader does not support this format.";

/// A fully assembled message: the top-level header block and the body.
///
/// The header never contains a blank line, so the header/body split of the
/// final message stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Top-level headers, CRLF-separated, no trailing line ending.
    pub header: String,
    /// Message body.
    pub content: String,
}

impl ComposedMessage {
    /// Assembles the full RFC 5322 message: header, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.content.len() + 4);
        out.extend_from_slice(self.header.as_bytes());
        out.extend_from_slice(CRLF.as_bytes());
        out.extend_from_slice(CRLF.as_bytes());
        out.extend_from_slice(self.content.as_bytes());
        out
    }
}

/// Generates a boundary token for one nesting level.
///
/// The level tag keeps tokens from different nesting depths distinct even in
/// the unlikely event of a random collision; the random part only needs to be
/// unique within a single message.
fn make_boundary(level: u8) -> String {
    let mut token = String::with_capacity(36);
    for _ in 0..32 {
        let digit = fastrand::u8(0..16);
        token.push(char::from_digit(u32::from(digit), 16).unwrap_or('0'));
    }
    format!("=_{}.{}", level, token)
}

/// Reads the value of header `name` out of a raw header block, unfolding
/// continuation lines and stopping at the first `;` parameter.
pub(crate) fn header_value(header: &str, name: &str) -> Option<String> {
    let unfolded = header
        .replace("\r\n\t", "")
        .replace("\r\n ", "")
        .replace("\n\t", "")
        .replace("\n ", "");
    for line in unfolded.lines() {
        let mut split = line.splitn(2, ':');
        if let (Some(key), Some(value)) = (split.next(), split.next()) {
            if key.trim().eq_ignore_ascii_case(name) {
                let value = value.split(';').next().unwrap_or("").trim();
                return Some(value.to_ascii_lowercase());
            }
        }
    }
    None
}

fn has_disposition(part: &MessagePart, disposition: &str) -> bool {
    header_value(&part.header, "content-disposition").as_deref() == Some(disposition)
}

fn multipart_header(kind: &str, boundary: &str) -> String {
    format!("Content-Type: multipart/{};{}\tboundary=\"{}\"", kind, CRLF, boundary)
}

fn part_block(boundary: &str, part: &MessagePart) -> String {
    format!("--{}{}{}{}{}{}", boundary, CRLF, part.header, CRLF, CRLF, part.content)
}

/// Builds the final message structure from up to one text part, one HTML
/// part and any number of attachment parts.
///
/// A single body with no attachments is used directly. Otherwise the parts
/// are wrapped in the conventional nesting: text+html always pair up inside
/// `multipart/alternative`; inline parts pull that group into
/// `multipart/related`; attachment parts wrap the result in
/// `multipart/mixed`. Each level gets its own boundary token.
///
/// `Date`, `X-Mailer` and `MIME-Version` headers are appended here; any
/// other top-level headers are the caller's business.
pub fn compose(
    text: Option<&MessagePart>,
    html: Option<&MessagePart>,
    attachments: &[MessagePart],
) -> Result<ComposedMessage, Error> {
    if text.is_none() && html.is_none() {
        return Err(Error::InvalidState("message is not set"));
    }

    let mut violations = Vec::new();
    if let Some(part) = text {
        if header_value(&part.header, "content-type").as_deref() != Some("text/plain") {
            violations.push("invalid text message type");
        }
    }
    if let Some(part) = html {
        if header_value(&part.header, "content-type").as_deref() != Some("text/html") {
            violations.push("invalid html message type");
        }
    }
    for part in attachments {
        if !has_disposition(part, "inline") && !has_disposition(part, "attachment") {
            violations.push("invalid attachment type");
            break;
        }
    }
    if !violations.is_empty() {
        return Err(Error::invalid_argument(violations));
    }

    let mut header = vec![
        format!("Date: {}", httpdate::fmt_http_date(SystemTime::now())),
        format!("X-Mailer: missive {}", env!("CARGO_PKG_VERSION")),
    ];
    let mut body = Vec::new();

    let multipart = (text.is_some() && html.is_some()) || !attachments.is_empty();
    if multipart {
        let b1 = make_boundary(1);
        let b2 = make_boundary(2);
        let b3 = make_boundary(3);
        let any_inline = attachments.iter().any(|p| has_disposition(p, "inline"));
        let any_attachment = attachments.iter().any(|p| has_disposition(p, "attachment"));
        let inline_blocks = |boundary: &str| -> Vec<String> {
            attachments
                .iter()
                .filter(|p| has_disposition(p, "inline"))
                .map(|p| part_block(boundary, p))
                .collect()
        };
        let attachment_blocks = |boundary: &str| -> Vec<String> {
            attachments
                .iter()
                .filter(|p| has_disposition(p, "attachment"))
                .map(|p| part_block(boundary, p))
                .collect()
        };
        let all_blocks = |boundary: &str| -> Vec<String> {
            attachments.iter().map(|p| part_block(boundary, p)).collect()
        };

        body.push(format!("{}{}", PREAMBLE, CRLF));

        match (text, html) {
            (Some(text), Some(html)) => {
                if any_inline && any_attachment {
                    header.push(multipart_header("mixed", &b1));
                    body.push(format!("--{}", b1));
                    body.push(format!("{}{}", multipart_header("related", &b2), CRLF));
                    body.push(format!("--{}", b2));
                    body.push(format!("{}{}", multipart_header("alternative", &b3), CRLF));
                    body.push(part_block(&b3, text));
                    body.push(part_block(&b3, html));
                    body.push(format!("--{}--", b3));
                    body.extend(inline_blocks(&b2));
                    body.push(format!("--{}--", b2));
                    body.extend(attachment_blocks(&b1));
                    body.push(format!("--{}--", b1));
                } else if any_inline {
                    header.push(multipart_header("related", &b1));
                    body.push(format!("--{}", b1));
                    body.push(format!("{}{}", multipart_header("alternative", &b2), CRLF));
                    body.push(part_block(&b2, text));
                    body.push(part_block(&b2, html));
                    body.push(format!("--{}--", b2));
                    body.extend(all_blocks(&b1));
                    body.push(format!("--{}--", b1));
                } else if any_attachment {
                    header.push(multipart_header("mixed", &b1));
                    body.push(format!("--{}", b1));
                    body.push(format!("{}{}", multipart_header("alternative", &b2), CRLF));
                    body.push(part_block(&b2, text));
                    body.push(part_block(&b2, html));
                    body.push(format!("--{}--", b2));
                    body.extend(all_blocks(&b1));
                    body.push(format!("--{}--", b1));
                } else {
                    header.push(multipart_header("alternative", &b1));
                    body.push(part_block(&b1, text));
                    body.push(part_block(&b1, html));
                    body.push(format!("--{}--", b1));
                }
            }
            (Some(text), None) => {
                header.push(multipart_header("mixed", &b1));
                body.push(part_block(&b1, text));
                body.extend(all_blocks(&b1));
                body.push(format!("--{}--", b1));
            }
            (None, Some(html)) => {
                if any_inline && any_attachment {
                    header.push(multipart_header("mixed", &b1));
                    body.push(format!("--{}", b1));
                    body.push(format!("{}{}", multipart_header("related", &b2), CRLF));
                    body.push(part_block(&b2, html));
                    body.extend(inline_blocks(&b2));
                    body.push(format!("--{}--", b2));
                    body.extend(attachment_blocks(&b1));
                    body.push(format!("--{}--", b1));
                } else if any_inline {
                    header.push(multipart_header("related", &b1));
                    body.push(part_block(&b1, html));
                    body.extend(all_blocks(&b1));
                    body.push(format!("--{}--", b1));
                } else {
                    header.push(multipart_header("mixed", &b1));
                    body.push(part_block(&b1, html));
                    body.extend(all_blocks(&b1));
                    body.push(format!("--{}--", b1));
                }
            }
            (None, None) => unreachable!("checked above"),
        }
    } else {
        // exactly one body, no attachments: its headers become top-level
        let part = text.or(html).expect("checked above");
        header.push(part.header.clone());
        body.push(part.content.clone());
    }

    header.push("MIME-Version: 1.0".to_string());

    Ok(ComposedMessage {
        header: header.join(CRLF),
        content: body.join(CRLF),
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mime::part::{Disposition, PartBuilder, TransferEncoding};

    fn text_part() -> MessagePart {
        PartBuilder::new()
            .mime_type("text/plain")
            .charset("utf-8")
            .build("plain body")
            .unwrap()
    }

    fn html_part() -> MessagePart {
        PartBuilder::new()
            .mime_type("text/html")
            .charset("utf-8")
            .build("<p>html body</p>")
            .unwrap()
    }

    fn inline_part() -> MessagePart {
        PartBuilder::new()
            .mime_type("image/png")
            .encoding(TransferEncoding::Base64)
            .disposition(Disposition::Inline)
            .content_id("img@local")
            .build(&[1u8, 2, 3][..])
            .unwrap()
    }

    fn attachment_part() -> MessagePart {
        PartBuilder::new()
            .mime_type("application/zip")
            .filename("a.zip")
            .encoding(TransferEncoding::Base64)
            .disposition(Disposition::Attachment)
            .build(&[4u8, 5, 6][..])
            .unwrap()
    }

    fn boundaries_of(message: &ComposedMessage) -> Vec<String> {
        let mut found = Vec::new();
        let full = format!("{}\r\n{}", message.header, message.content);
        for chunk in full.split("boundary=\"").skip(1) {
            if let Some(end) = chunk.find('"') {
                let token = &chunk[..end];
                if !found.iter().any(|b| b == token) {
                    found.push(token.to_string());
                }
            }
        }
        found
    }

    #[test]
    fn no_body_is_invalid_state() {
        assert_eq!(
            compose(None, None, &[]).unwrap_err(),
            Error::InvalidState("message is not set")
        );
    }

    #[test]
    fn text_only_is_not_multipart() {
        let text = text_part();
        let message = compose(Some(&text), None, &[]).unwrap();
        assert!(!message.header.contains("multipart/"));
        assert!(message.header.contains(&text.header));
        assert!(message.header.starts_with("Date: "));
        assert!(message.header.contains("X-Mailer: missive "));
        assert!(message.header.ends_with("MIME-Version: 1.0"));
        assert_eq!(message.content, "plain body");
        assert!(!message.header.contains("\r\n\r\n"));
    }

    #[test]
    fn text_and_html_is_alternative() {
        let (text, html) = (text_part(), html_part());
        let message = compose(Some(&text), Some(&html), &[]).unwrap();
        assert!(message.header.contains("multipart/alternative"));
        let boundaries = boundaries_of(&message);
        assert_eq!(boundaries.len(), 1);
        let b = &boundaries[0];
        assert!(message.content.contains(&format!("--{}\r\n", b)));
        assert!(message.content.ends_with(&format!("--{}--", b)));
        assert!(message.content.starts_with(PREAMBLE));
    }

    #[test]
    fn inline_attachment_nests_related_around_alternative() {
        let (text, html) = (text_part(), html_part());
        let message = compose(Some(&text), Some(&html), &[inline_part()]).unwrap();
        assert!(message.header.contains("multipart/related"));
        assert!(message.content.contains("multipart/alternative"));
        assert!(!message.content.contains("multipart/mixed"));
        assert_eq!(boundaries_of(&message).len(), 2);
    }

    #[test]
    fn mixed_wraps_all_three_levels() {
        let (text, html) = (text_part(), html_part());
        let message =
            compose(Some(&text), Some(&html), &[inline_part(), attachment_part()]).unwrap();
        assert!(message.header.contains("multipart/mixed"));
        assert!(message.content.contains("multipart/related"));
        assert!(message.content.contains("multipart/alternative"));
        let boundaries = boundaries_of(&message);
        assert_eq!(boundaries.len(), 3);
        // innermost closes first, outermost last
        let closes: Vec<usize> = boundaries
            .iter()
            .map(|b| message.content.find(&format!("--{}--", b)).unwrap())
            .collect();
        assert!(closes[2] < closes[1] && closes[1] < closes[0]);
    }

    #[test]
    fn text_with_attachments_is_plain_mixed() {
        let text = text_part();
        let message = compose(Some(&text), None, &[attachment_part()]).unwrap();
        assert!(message.header.contains("multipart/mixed"));
        assert!(!message.content.contains("multipart/"));
        assert_eq!(boundaries_of(&message).len(), 1);
    }

    #[test]
    fn html_with_inline_only_is_related() {
        let html = html_part();
        let message = compose(None, Some(&html), &[inline_part()]).unwrap();
        assert!(message.header.contains("multipart/related"));
        assert!(!message.content.contains("multipart/"));
    }

    #[test]
    fn html_with_both_dispositions_skips_alternative() {
        let html = html_part();
        let message =
            compose(None, Some(&html), &[inline_part(), attachment_part()]).unwrap();
        assert!(message.header.contains("multipart/mixed"));
        assert!(message.content.contains("multipart/related"));
        assert!(!message.content.contains("multipart/alternative"));
    }

    #[test]
    fn wrong_part_types_are_rejected_together() {
        let not_text = html_part();
        let not_html = text_part();
        let plain = PartBuilder::new()
            .mime_type("text/plain")
            .build("no disposition header stripped")
            .unwrap();
        let mut stripped = plain.clone();
        stripped.header = "Content-Type: text/plain".to_string();
        let err =
            compose(Some(&not_text), Some(&not_html), std::slice::from_ref(&stripped)).unwrap_err();
        assert_eq!(
            err.violations().unwrap(),
            [
                "invalid text message type",
                "invalid html message type",
                "invalid attachment type",
            ]
        );
    }

    #[test]
    fn boundaries_are_distinct() {
        let (text, html) = (text_part(), html_part());
        let message =
            compose(Some(&text), Some(&html), &[inline_part(), attachment_part()]).unwrap();
        let boundaries = boundaries_of(&message);
        assert_eq!(boundaries.len(), 3);
        assert!(boundaries[0] != boundaries[1]);
        assert!(boundaries[1] != boundaries[2]);
    }

    #[test]
    fn to_bytes_joins_header_and_body() {
        let text = text_part();
        let message = compose(Some(&text), None, &[]).unwrap();
        let bytes = message.to_bytes();
        let full = String::from_utf8(bytes).unwrap();
        assert_eq!(
            full,
            format!("{}\r\n\r\n{}", message.header, message.content)
        );
        // exactly one header/body separator
        assert_eq!(full.matches("\r\n\r\n").count(), 1);
    }
}
