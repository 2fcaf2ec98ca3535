//! Module `data_channel`
//!
//! Negotiates the secondary connection used by LIST, NLST, RETR and STOR.
//! Passive mode connects out to the address from the PASV reply; active
//! mode listens locally, announces the address with PORT and accepts the
//! server's connection once the transfer command has been accepted.

use log::{debug, error, info, warn};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crate::control::ControlChannel;
use crate::error::{FtpClientError, Result};
use crate::protocol::{Command, Reply};
use crate::transfer::{DataMode, HostPort};

const INITIAL_POLL_MS: u64 = 10;
const MAX_POLL_MS: u64 = 200;

/// Where the data connection of one transfer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannelDescriptor {
    /// Server endpoint taken from the PASV reply.
    Passive(HostPort),
    /// Local endpoint announced with PORT.
    Active(HostPort),
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone)]
pub struct Negotiation {
    pub descriptor: DataChannelDescriptor,
    /// The server's answer to PASV or PORT.
    pub reply: Reply,
}

/// Socket held between negotiation and the start of the transfer.
#[derive(Debug)]
enum PendingChannel {
    Connected(TcpStream, HostPort),
    Listening(TcpListener, HostPort),
}

/// A live data connection. Dropping it closes the socket.
#[derive(Debug)]
pub struct DataConnection {
    stream: TcpStream,
    descriptor: DataChannelDescriptor,
}

impl DataConnection {
    pub fn descriptor(&self) -> DataChannelDescriptor {
        self.descriptor
    }

    /// Flushes and half-closes the sending side, signalling end of upload.
    pub fn finish(mut self) -> io::Result<()> {
        self.stream.flush()?;
        self.stream.shutdown(Shutdown::Write)
    }
}

impl Read for DataConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for DataConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Sets up data connections and holds at most one pending socket.
#[derive(Debug)]
pub struct DataChannelNegotiator {
    mode: DataMode,
    accept_timeout: Duration,
    active_ip: Option<Ipv4Addr>,
    active_port: u16,
    pending: Option<PendingChannel>,
}

impl DataChannelNegotiator {
    pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(mode: DataMode) -> Self {
        Self {
            mode,
            accept_timeout: Self::DEFAULT_ACCEPT_TIMEOUT,
            active_ip: None,
            active_port: 0,
            pending: None,
        }
    }

    /// How long active mode waits for the server to connect back.
    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Fixed listening endpoint for active mode. Without an address the
    /// control socket's local address is used; port 0 picks a free port.
    pub fn with_active_endpoint(mut self, ip: Option<Ipv4Addr>, port: u16) -> Self {
        self.active_ip = ip;
        self.active_port = port;
        self
    }

    pub fn accept_timeout(&self) -> Duration {
        self.accept_timeout
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DataMode) {
        self.mode = mode;
    }

    /// True while a negotiated socket waits for `establish`.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Prepares a data connection, closing any leftover from an earlier
    /// negotiation first.
    pub fn negotiate(&mut self, control: &mut ControlChannel) -> Result<Negotiation> {
        if self.release() {
            warn!("Closed leftover data socket from a previous transfer");
        }

        match self.mode {
            DataMode::Passive => self.negotiate_passive(control),
            DataMode::Active => self.negotiate_active(control),
        }
    }

    /// Hands out the data connection prepared by `negotiate`.
    ///
    /// In active mode this waits up to the accept timeout for the server to
    /// connect; the listener is closed whatever the outcome.
    pub fn establish(&mut self) -> Result<DataConnection> {
        match self.pending.take() {
            Some(PendingChannel::Connected(stream, addr)) => Ok(DataConnection {
                stream,
                descriptor: DataChannelDescriptor::Passive(addr),
            }),
            Some(PendingChannel::Listening(listener, addr)) => {
                let stream = accept_with_timeout(&listener, addr, self.accept_timeout)?;
                Ok(DataConnection {
                    stream,
                    descriptor: DataChannelDescriptor::Active(addr),
                })
            }
            None => Err(FtpClientError::DataConnectError {
                target: "data channel".into(),
                source: io::Error::new(ErrorKind::NotConnected, "no data channel negotiated"),
            }),
        }
    }

    /// Closes the pending socket, if any. Returns whether one was open.
    pub fn release(&mut self) -> bool {
        match self.pending.take() {
            Some(PendingChannel::Connected(stream, addr)) => {
                let _ = stream.shutdown(Shutdown::Both);
                debug!("Released passive data connection to {}", addr);
                true
            }
            Some(PendingChannel::Listening(_, addr)) => {
                debug!("Released active data listener on {}", addr);
                true
            }
            None => false,
        }
    }

    fn negotiate_passive(&mut self, control: &mut ControlChannel) -> Result<Negotiation> {
        let reply = control.send(&Command::PASV)?;
        if !reply.is_completion() {
            return Err(FtpClientError::PasvRejected(reply));
        }

        let addr = HostPort::decode(&reply.message())?;
        let stream =
            TcpStream::connect(addr.socket_addr()).map_err(|source| {
                FtpClientError::DataConnectError {
                    target: addr.to_string(),
                    source,
                }
            })?;

        info!("Passive data connection opened to {}", addr);
        self.pending = Some(PendingChannel::Connected(stream, addr));
        Ok(Negotiation {
            descriptor: DataChannelDescriptor::Passive(addr),
            reply,
        })
    }

    fn negotiate_active(&mut self, control: &mut ControlChannel) -> Result<Negotiation> {
        let ip = match self.active_ip.map(IpAddr::V4).or_else(|| control.local_ip()) {
            Some(IpAddr::V4(ip)) => ip,
            Some(IpAddr::V6(ip)) => {
                return Err(FtpClientError::DataConnectError {
                    target: ip.to_string(),
                    source: io::Error::new(
                        ErrorKind::Unsupported,
                        "PORT can only announce IPv4 addresses",
                    ),
                });
            }
            None => return Err(FtpClientError::NotConnected),
        };

        let bind_target = format!("{}:{}", ip, self.active_port);
        let listener = TcpListener::bind((ip, self.active_port)).map_err(|source| {
            FtpClientError::DataConnectError {
                target: bind_target.clone(),
                source,
            }
        })?;
        let port = listener
            .local_addr()
            .map_err(|source| FtpClientError::DataConnectError {
                target: bind_target,
                source,
            })?
            .port();
        let endpoint = HostPort::new(ip, port);

        // An error or refusal drops the listener on return.
        let reply = control.send(&Command::PORT(endpoint))?;
        if !reply.is_completion() {
            return Err(FtpClientError::PortRejected(reply));
        }

        info!("Listening for active data connection on {}", endpoint);
        self.pending = Some(PendingChannel::Listening(listener, endpoint));
        Ok(Negotiation {
            descriptor: DataChannelDescriptor::Active(endpoint),
            reply,
        })
    }
}

/// Polls a non-blocking listener until a peer connects or `timeout` elapses.
fn accept_with_timeout(
    listener: &TcpListener,
    addr: HostPort,
    timeout: Duration,
) -> Result<TcpStream> {
    listener
        .set_nonblocking(true)
        .map_err(|source| FtpClientError::DataConnectError {
            target: addr.to_string(),
            source,
        })?;

    let deadline = Instant::now() + timeout;
    let mut delay = Duration::from_millis(INITIAL_POLL_MS);

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("Data connection accepted from {} on {}", peer, addr);
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Failed to set data stream to blocking mode: {}", e);
                }
                return Ok(stream);
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                let now = Instant::now();
                if now >= deadline {
                    error!("Timeout waiting for data connection on {}", addr);
                    return Err(FtpClientError::DataConnectTimeout(addr.socket_addr()));
                }
                thread::sleep(delay.min(deadline - now));
                delay = (delay * 2).min(Duration::from_millis(MAX_POLL_MS));
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                error!("Fatal error accepting data connection on {}: {}", addr, source);
                return Err(FtpClientError::DataConnectError {
                    target: addr.to_string(),
                    source,
                });
            }
        }
    }
}
