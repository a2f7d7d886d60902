//! SMTP client wire machinery.

mod connection;
pub mod mock;
mod net;

pub use self::connection::SmtpConnection;
pub use self::net::{NetworkStream, TlsMode, TlsParameters};

/// The codec that makes message content transparent for the DATA phase:
/// every line starting with `.` gets a second `.` so the end-of-data marker
/// stays unambiguous.
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    at_line_start: bool,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec {
            at_line_start: true,
        }
    }

    /// Appends `frame` to `buf` with dot-stuffing applied.
    ///
    /// The codec carries its line state across calls, so a message may be
    /// fed in arbitrary slices. The very first line counts as a line start.
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        buf.reserve(frame.len());
        for &byte in frame {
            if self.at_line_start && byte == b'.' {
                buf.push(b'.');
            }
            buf.push(byte);
            self.at_line_start = byte == b'\n';
        }
    }
}

/// Returns the string replacing all the CRLF with `<CRLF>`, for debug logs.
pub(crate) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codec() {
        let mut codec = ClientCodec::new();
        let mut buf: Vec<u8> = vec![];

        codec.encode(b".leading dot\r\n", &mut buf);
        codec.encode(b"body\r\n", &mut buf);
        codec.encode(b".\r\n", &mut buf);
        codec.encode(b"..\r\n", &mut buf);
        codec.encode(b"dot. inside\r\n", &mut buf);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "..leading dot\r\nbody\r\n..\r\n...\r\ndot. inside\r\n"
        );
    }

    #[test]
    fn test_codec_split_frames() {
        let mut codec = ClientCodec::new();
        let mut buf: Vec<u8> = vec![];

        codec.encode(b"a\r\n", &mut buf);
        codec.encode(b".b\r\n", &mut buf);
        assert_eq!(String::from_utf8(buf).unwrap(), "a\r\n..b\r\n");
    }

    #[test]
    fn test_codec_bare_lf_lines() {
        let mut codec = ClientCodec::new();
        let mut buf: Vec<u8> = vec![];

        codec.encode(b"a\n.b\n", &mut buf);
        assert_eq!(String::from_utf8(buf).unwrap(), "a\n..b\n");
    }

    #[test]
    fn test_escape_crlf() {
        assert_eq!(escape_crlf("\r\n"), "<CRLF>");
        assert_eq!(escape_crlf("EHLO my_name\r\n"), "EHLO my_name<CRLF>");
        assert_eq!(
            escape_crlf("EHLO my_name\r\nSIZE 42\r\n"),
            "EHLO my_name<CRLF>SIZE 42<CRLF>"
        );
    }
}
