//! Module `channel`
//!
//! Owns the control connection and provides the synchronous
//! command/reply primitive every other component is built on.

use log::{debug, info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{FtpClientError, Result};
use crate::protocol::{Command, Reply, ReplyParser};

const READ_CHUNK_SIZE: usize = 4096;

/// The control connection to one FTP server.
///
/// Any read or write failure, as well as the server closing the socket,
/// drops the connection; later calls fail with `NotConnected`.
#[derive(Debug, Default)]
pub struct ControlChannel {
    stream: Option<TcpStream>,
    parser: ReplyParser,
    peer: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose connect and read operations give up after the given deadlines.
    pub fn with_timeouts(connect_timeout: Option<Duration>, read_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            ..Self::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// `host:port` of the connected server.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Local address of the control socket, used to announce PORT endpoints.
    pub fn local_ip(&self) -> Option<IpAddr> {
        self.stream
            .as_ref()
            .and_then(|stream| stream.local_addr().ok())
            .map(|addr| addr.ip())
    }

    /// Connects and returns the server greeting.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<Reply> {
        if self.stream.is_some() {
            let peer = self.peer.clone().unwrap_or_default();
            return Err(FtpClientError::AlreadyConnected(peer));
        }

        let target = format!("{host}:{port}");
        let stream = self
            .open_stream(host, port)
            .and_then(|stream| {
                stream.set_read_timeout(self.read_timeout)?;
                Ok(stream)
            })
            .map_err(|source| FtpClientError::ConnectError {
                target: target.clone(),
                source,
            })?;

        info!("Control connection established to {}", target);
        self.stream = Some(stream);
        self.parser.reset();
        self.peer = Some(target);

        self.read_reply()
    }

    /// Sends `command` and waits for its complete reply.
    pub fn send(&mut self, command: &Command) -> Result<Reply> {
        command.validate()?;
        let stream = self.stream.as_mut().ok_or(FtpClientError::NotConnected)?;

        debug!("--> {}", command.loggable());
        let line = format!("{command}\r\n");
        let written = stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush());
        if let Err(e) = written {
            self.drop_connection(&e);
            return Err(e.into());
        }

        self.read_reply()
    }

    /// Reads the next reply without sending anything.
    pub fn read_reply(&mut self) -> Result<Reply> {
        self.receive(true)
    }

    /// Waits at most `timeout` for the next reply.
    ///
    /// Returns `None` when nothing complete arrived in time; unlike
    /// `read_reply`, a timeout keeps the connection. The configured read
    /// timeout is restored afterwards.
    pub fn read_reply_within(&mut self, timeout: Duration) -> Result<Option<Reply>> {
        if let Some(reply) = self.parser.next_reply()? {
            debug!("<-- {}", reply);
            return Ok(Some(reply));
        }

        let stream = self.stream.as_ref().ok_or(FtpClientError::NotConnected)?;
        stream.set_read_timeout(Some(timeout))?;
        let result = self.receive(false);
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.set_read_timeout(self.read_timeout) {
                warn!("Failed to restore control read timeout: {}", e);
            }
        }

        match result {
            Ok(reply) => Ok(Some(reply)),
            Err(FtpClientError::IoError(e)) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn receive(&mut self, drop_on_timeout: bool) -> Result<Reply> {
        if let Some(reply) = self.parser.next_reply()? {
            debug!("<-- {}", reply);
            return Ok(reply);
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let stream = self.stream.as_mut().ok_or(FtpClientError::NotConnected)?;
            let read = stream.read(&mut chunk);
            let n = match read {
                Ok(0) => {
                    let e = io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "control connection closed by server",
                    );
                    self.drop_connection(&e);
                    return Err(e.into());
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if !drop_on_timeout && is_timeout(&e) => return Err(e.into()),
                Err(e) => {
                    self.drop_connection(&e);
                    return Err(e.into());
                }
            };

            if let Some(reply) = self.parser.feed(&chunk[..n])? {
                debug!("<-- {}", reply);
                return Ok(reply);
            }
        }
    }

    /// Closes the control connection without sending QUIT.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(
                "Control connection to {} closed",
                self.peer.as_deref().unwrap_or("server")
            );
        }
        self.peer = None;
        self.parser.reset();
    }

    fn drop_connection(&mut self, cause: &io::Error) {
        warn!(
            "Lost control connection to {}: {}",
            self.peer.as_deref().unwrap_or("server"),
            cause
        );
        self.disconnect();
    }

    fn open_stream(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let Some(timeout) = self.connect_timeout else {
            return TcpStream::connect((host, port));
        };

        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "host resolved to no addresses")
        }))
    }
}

/// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
