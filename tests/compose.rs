//! End-to-end checks of the MIME composer surface.

use missive::mime::{
    compose, decode_body, decode_header_word, encode_header_word, quoted_printable_decode,
    quoted_printable_encode, Disposition, HeaderEncoding, PartBuilder, TransferEncoding,
};
use pretty_assertions::assert_eq;

#[test]
fn printable_headers_stay_readable() {
    for value in ["Weekly report", "Re: invoice #42", "plain ascii!"] {
        let encoded =
            encode_header_word(value, "utf-8", HeaderEncoding::QuotedPrintable, 72, "\r\n").unwrap();
        assert_eq!(encoded, value);
    }
}

#[test]
fn quoted_printable_round_trips_at_any_width() {
    let samples = [
        "short",
        "with trailing space ",
        "líne wïth áccents and ümlauts",
        "multi\r\nline\r\ncontent",
        "= equals = everywhere =",
    ];
    for sample in samples {
        for width in [4usize, 7, 12, 40, 72, 998] {
            let encoded = quoted_printable_encode(sample, width, "\r\n").unwrap();
            assert_eq!(
                quoted_printable_decode(&encoded),
                sample.as_bytes(),
                "width {width}, sample {sample:?}"
            );
        }
    }
}

#[test]
fn base64_part_content_decodes_to_the_input() {
    let payload: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
    let part = PartBuilder::new()
        .mime_type("application/octet-stream")
        .filename("blob.bin")
        .encoding(TransferEncoding::Base64)
        .disposition(Disposition::Attachment)
        .build(&payload)
        .unwrap();

    for line in part.content.split("\r\n") {
        assert!(line.len() <= 72);
    }
    let joined: String = part.content.replace("\r\n", "");
    assert_eq!(
        decode_body(&joined, Some(TransferEncoding::Base64)).unwrap(),
        payload
    );
}

#[test]
fn single_body_header_is_part_header_plus_trailers() {
    let text = PartBuilder::new()
        .mime_type("text/plain")
        .charset("utf-8")
        .build("just text")
        .unwrap();
    let message = compose(Some(&text), None, &[]).unwrap();

    let date_line = message
        .header
        .lines()
        .next()
        .expect("composed header is never empty");
    assert!(date_line.starts_with("Date: "));
    let expected = format!(
        "{}\r\nX-Mailer: missive {}\r\n{}\r\nMIME-Version: 1.0",
        date_line,
        env!("CARGO_PKG_VERSION"),
        text.header
    );
    assert_eq!(message.header, expected);
    assert!(!message.header.contains("multipart/"));
}

#[test]
fn alternative_message_has_exactly_one_boundary() {
    let text = PartBuilder::new()
        .mime_type("text/plain")
        .build("text body")
        .unwrap();
    let html = PartBuilder::new()
        .mime_type("text/html")
        .build("<b>html body</b>")
        .unwrap();
    let message = compose(Some(&text), Some(&html), &[]).unwrap();

    assert!(message.header.contains("multipart/alternative"));
    assert_eq!(message.header.matches("boundary=\"").count(), 1);
    assert_eq!(message.content.matches("boundary=\"").count(), 0);
}

#[test]
fn inline_attachment_nests_related_over_alternative() {
    let text = PartBuilder::new()
        .mime_type("text/plain")
        .build("text body")
        .unwrap();
    let html = PartBuilder::new()
        .mime_type("text/html")
        .build("<img src=\"cid:logo@x\">")
        .unwrap();
    let logo = PartBuilder::new()
        .mime_type("image/png")
        .encoding(TransferEncoding::Base64)
        .disposition(Disposition::Inline)
        .content_id("logo@x")
        .build(&[1u8, 2, 3][..])
        .unwrap();
    let message = compose(Some(&text), Some(&html), &[logo]).unwrap();

    // outer related carries its boundary in the top header, the inner
    // alternative declares its own inside the body
    assert!(message.header.contains("multipart/related"));
    assert!(message.content.contains("multipart/alternative"));
    assert_eq!(message.header.matches("boundary=\"").count(), 1);
    assert_eq!(message.content.matches("boundary=\"").count(), 1);

    let outer = boundary_after(&message.header, "multipart/related");
    let inner = boundary_after(&message.content, "multipart/alternative");
    assert_ne!(outer, inner);
    // the alternative block closes before the related one
    let inner_close = message.content.find(&format!("--{inner}--")).unwrap();
    let outer_close = message.content.find(&format!("--{outer}--")).unwrap();
    assert!(inner_close < outer_close);
}

#[test]
fn encoded_subject_decodes_back() {
    let decoded = decode_header_word("=?UTF-8?Q?Caf=C3=A9?=");
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].charset, "UTF-8");
    assert_eq!(String::from_utf8(decoded[0].value.clone()).unwrap(), "Café");
}

#[test]
fn full_message_assembles_with_single_header_separator() {
    let text = PartBuilder::new()
        .mime_type("text/plain")
        .build("body text here")
        .unwrap();
    let attachment = PartBuilder::new()
        .mime_type("text/plain")
        .filename("notes.txt")
        .encoding(TransferEncoding::Base64)
        .disposition(Disposition::Attachment)
        .build("some notes")
        .unwrap();
    let message = compose(Some(&text), None, &[attachment]).unwrap();
    let wire = String::from_utf8(message.to_bytes()).unwrap();

    let (header, body) = wire.split_once("\r\n\r\n").unwrap();
    assert!(!header.contains("\r\n\r\n"));
    assert!(body.starts_with("This is a message in MIME Format."));
}

fn boundary_after(text: &str, marker: &str) -> String {
    let at = text.find(marker).unwrap();
    let rest = &text[at..];
    let start = rest.find("boundary=\"").unwrap() + "boundary=\"".len();
    let rest = &rest[start..];
    rest[..rest.find('"').unwrap()].to_string()
}
