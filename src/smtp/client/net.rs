//! The underlying network stream: plain TCP or TLS over TCP.

use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use native_tls::{Protocol, TlsConnector, TlsStream};

use crate::smtp::client::mock::MockStream;
use crate::smtp::error::{self, Error};

/// How the stream is wrapped when the caller asks for an encrypted session.
///
/// This mirrors the scheme names accepted by the legacy dial strings; on a
/// modern TLS backend the SSL variants can only pin the minimum protocol
/// version, not resurrect the retired protocols themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS (1.0 or newer).
    Tls,
    /// Generic SSL: accept the oldest protocol the backend still offers.
    Ssl,
    /// SSLv2 dial scheme.
    Sslv2,
    /// SSLv3 dial scheme.
    Sslv3,
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tls" => Ok(TlsMode::Tls),
            "ssl" => Ok(TlsMode::Ssl),
            "sslv2" => Ok(TlsMode::Sslv2),
            "sslv3" => Ok(TlsMode::Sslv3),
            _ => Err(error::invalid_argument(vec!["invalid ssl version value"])),
        }
    }
}

impl TlsMode {
    fn min_protocol(self) -> Protocol {
        match self {
            TlsMode::Tls => Protocol::Tlsv10,
            TlsMode::Ssl | TlsMode::Sslv2 | TlsMode::Sslv3 => Protocol::Sslv3,
        }
    }
}

/// TLS configuration for a connection: a connector plus the name presented
/// for certificate validation.
#[derive(Clone)]
pub struct TlsParameters {
    connector: TlsConnector,
    domain: String,
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl TlsParameters {
    /// Builds the parameters for `domain` from a mode, or from a
    /// caller-supplied connector when one is given (the mode is then only a
    /// dial-scheme label).
    pub fn new(
        mode: TlsMode,
        context: Option<TlsConnector>,
        domain: String,
    ) -> Result<TlsParameters, Error> {
        let connector = match context {
            Some(connector) => connector,
            None => TlsConnector::builder()
                .min_protocol_version(Some(mode.min_protocol()))
                .build()
                .map_err(error::tls)?,
        };
        Ok(TlsParameters { connector, domain })
    }
}

/// Represents the different types of underlying network streams
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(Box<TlsStream<TcpStream>>),
    /// Mock stream
    Mock(MockStream),
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkStream::Tcp(_) => "NetworkStream::Tcp",
            NetworkStream::Tls(_) => "NetworkStream::Tls",
            NetworkStream::Mock(_) => "NetworkStream::Mock",
        })
    }
}

impl NetworkStream {
    /// Opens a stream to `host:port`, bounded by `timeout`, wrapping it in
    /// TLS when parameters are given.
    ///
    /// Name resolution may yield several addresses; they are tried in order
    /// and the last connect error is reported if none succeeds.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        tls: Option<&TlsParameters>,
    ) -> Result<NetworkStream, Error> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(error::network)?
            .collect();

        let mut last_err = None;
        let mut tcp_stream = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    tcp_stream = Some(stream);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let tcp_stream = match tcp_stream {
            Some(stream) => stream,
            None => {
                return Err(match last_err {
                    Some(e) => error::network(e),
                    None => error::network(io::Error::new(
                        io::ErrorKind::NotFound,
                        "no address for host",
                    )),
                })
            }
        };

        match tls {
            Some(parameters) => {
                let tls_stream = parameters
                    .connector
                    .connect(&parameters.domain, tcp_stream)
                    .map_err(error::tls)?;
                Ok(NetworkStream::Tls(Box::new(tls_stream)))
            }
            None => Ok(NetworkStream::Tcp(tcp_stream)),
        }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(s) => s.shutdown(how),
            NetworkStream::Tls(s) => s.get_ref().shutdown(how),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Tells if the stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        match self {
            NetworkStream::Tcp(_) => false,
            NetworkStream::Tls(_) => true,
            NetworkStream::Mock(_) => false,
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_read_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_read_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_write_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_write_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(s) => s.read(buf),
            NetworkStream::Tls(s) => s.read(buf),
            NetworkStream::Mock(s) => s.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(s) => s.write(buf),
            NetworkStream::Tls(s) => s.write(buf),
            NetworkStream::Mock(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(s) => s.flush(),
            NetworkStream::Tls(s) => s.flush(),
            NetworkStream::Mock(s) => s.flush(),
        }
    }
}
