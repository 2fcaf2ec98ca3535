//! Transfer operations
//!
//! Sequences a complete transfer over the control and data connections:
//! negotiate the data channel, send the transfer command, require a 150/125
//! preliminary reply, move the bytes, close the data connection and read the
//! completion reply.

use log::{info, warn};
use std::io::{self, Read, Write};

use crate::control::ControlChannel;
use crate::error::{FtpClientError, Result};
use crate::protocol::{Command, responses};
use crate::transfer::file_ops::{DEFAULT_BUFFER_SIZE, pump};
use crate::transfer::{DataChannelNegotiator, DataConnection, TransferReport};

/// Drives LIST/NLST, RETR and STOR transfers.
#[derive(Debug)]
pub struct TransferEngine {
    negotiator: DataChannelNegotiator,
    buffer_size: usize,
}

impl TransferEngine {
    pub fn new(negotiator: DataChannelNegotiator) -> Self {
        Self {
            negotiator,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Chunk size used when moving data.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn negotiator(&self) -> &DataChannelNegotiator {
        &self.negotiator
    }

    pub fn negotiator_mut(&mut self) -> &mut DataChannelNegotiator {
        &mut self.negotiator
    }

    /// Runs `LIST`/`NLST` and writes the listing into `sink`.
    pub fn list<W>(
        &mut self,
        control: &mut ControlChannel,
        command: Command,
        sink: &mut W,
    ) -> Result<TransferReport>
    where
        W: Write + ?Sized,
    {
        let buffer_size = self.buffer_size;
        self.run(control, command, |mut data| pump(&mut data, sink, buffer_size))
    }

    /// Runs `RETR remote`. `open_sink` is only called once the server has
    /// accepted the command, so a refused download never touches local files.
    pub fn download<W, F>(
        &mut self,
        control: &mut ControlChannel,
        remote: &str,
        open_sink: F,
    ) -> Result<TransferReport>
    where
        W: Write,
        F: FnOnce() -> io::Result<W>,
    {
        let buffer_size = self.buffer_size;
        self.run(control, Command::RETR(remote.to_string()), |mut data| {
            let mut sink = open_sink()?;
            pump(&mut data, &mut sink, buffer_size)
        })
    }

    /// Runs `STOR remote`, sending `source` until it is exhausted.
    pub fn upload<R>(
        &mut self,
        control: &mut ControlChannel,
        remote: &str,
        source: &mut R,
    ) -> Result<TransferReport>
    where
        R: Read + ?Sized,
    {
        let buffer_size = self.buffer_size;
        self.run(control, Command::STOR(remote.to_string()), |mut data| {
            let sent = pump(source, &mut data, buffer_size)?;
            data.finish()?;
            Ok(sent)
        })
    }

    /// `move_bytes` owns the data connection, so it is closed before the
    /// completion reply is read.
    fn run<F>(
        &mut self,
        control: &mut ControlChannel,
        command: Command,
        move_bytes: F,
    ) -> Result<TransferReport>
    where
        F: FnOnce(DataConnection) -> io::Result<u64>,
    {
        command.validate()?;
        let negotiation = self.negotiator.negotiate(control)?;

        let preliminary = match control.send(&command) {
            Ok(reply) => reply,
            Err(e) => {
                self.negotiator.release();
                return Err(e);
            }
        };

        if !responses::opens_transfer(preliminary.code()) {
            self.negotiator.release();
            info!("{} refused: {}", command, preliminary);
            return Ok(TransferReport {
                negotiation: negotiation.reply,
                preliminary,
                completion: None,
                bytes: 0,
            });
        }

        let data = match self.negotiator.establish() {
            Ok(data) => data,
            Err(e) => {
                self.drain_completion(control);
                return Err(e);
            }
        };

        match move_bytes(data) {
            Ok(bytes) => {
                let completion = control.read_reply()?;
                info!("{} finished: {} bytes, {}", command, bytes, completion);
                Ok(TransferReport {
                    negotiation: negotiation.reply,
                    preliminary,
                    completion: Some(completion),
                    bytes,
                })
            }
            Err(error) => {
                warn!("{} aborted: {}", command, error);
                let reply = control.read_reply().ok();
                Err(FtpClientError::TransferAborted { error, reply })
            }
        }
    }

    /// Reads the reply the server sends after giving up on the data
    /// connection, keeping the control stream in step. Waits no longer than
    /// the accept timeout; a server that stays silent is left as is.
    fn drain_completion(&self, control: &mut ControlChannel) {
        if !control.is_connected() {
            return;
        }
        match control.read_reply_within(self.negotiator.accept_timeout()) {
            Ok(Some(reply)) => warn!("Server reply after failed data connection: {}", reply),
            Ok(None) => warn!("No reply after failed data connection"),
            Err(e) => warn!("No reply after failed data connection: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::DataMode;
    use std::io::{BufRead, BufReader, Cursor};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// One-connection FTP peer in passive mode. `on_transfer` receives the
    /// transfer command and the accepted data socket and returns the
    /// preliminary and completion replies to write around it.
    struct PassivePeer {
        control: ControlChannel,
        received: Arc<Mutex<Vec<String>>>,
        handle: thread::JoinHandle<()>,
    }

    impl PassivePeer {
        fn start<F>(mut on_transfer: F) -> Self
        where
            F: FnMut(&str, &TcpListener, &mut TcpStream) + Send + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let received = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&received);

            let handle = thread::spawn(move || {
                let data_listener = TcpListener::bind("127.0.0.1:0").unwrap();
                let data_port = data_listener.local_addr().unwrap().port();
                let (mut stream, _) = listener.accept().unwrap();
                stream.write_all(b"220 Ready\r\n").unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 {
                        break;
                    }
                    let line = line.trim_end().to_string();
                    log.lock().unwrap().push(line.clone());
                    if line == "PASV" {
                        let reply = format!(
                            "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                            data_port >> 8,
                            data_port & 0xff
                        );
                        stream.write_all(reply.as_bytes()).unwrap();
                    } else {
                        on_transfer(&line, &data_listener, &mut stream);
                    }
                }
            });

            let mut control = ControlChannel::new();
            control.connect("127.0.0.1", port).unwrap();
            Self {
                control,
                received,
                handle,
            }
        }

        fn finish(mut self) -> Vec<String> {
            self.control.disconnect();
            self.handle.join().unwrap();
            Arc::try_unwrap(self.received).unwrap().into_inner().unwrap()
        }
    }

    fn engine() -> TransferEngine {
        TransferEngine::new(DataChannelNegotiator::new(DataMode::Passive)).with_buffer_size(16)
    }

    #[test]
    fn test_list_collects_listing() {
        let mut peer = PassivePeer::start(|line, data_listener, control| {
            assert_eq!(line, "LIST pub");
            let (mut data, _) = data_listener.accept().unwrap();
            control.write_all(b"150 Here comes the directory listing\r\n").unwrap();
            data.write_all(b"-rw-r--r-- 1 ftp ftp 12 a.txt\r\n").unwrap();
            drop(data);
            control.write_all(b"226 Directory send OK\r\n").unwrap();
        });

        let mut sink = Vec::new();
        let report = engine()
            .list(&mut peer.control, Command::LIST(Some("pub".into())), &mut sink)
            .unwrap();
        assert_eq!(sink, b"-rw-r--r-- 1 ftp ftp 12 a.txt\r\n");
        assert_eq!(report.bytes, sink.len() as u64);
        assert_eq!(report.negotiation.code(), 227);
        assert_eq!(report.preliminary.code(), 150);
        assert_eq!(report.outcome().code(), 226);
        assert_eq!(report.replies().count(), 3);

        assert_eq!(peer.finish(), vec!["PASV", "LIST pub"]);
    }

    #[test]
    fn test_refused_download_never_opens_sink() {
        let mut peer = PassivePeer::start(|_, data_listener, control| {
            let _ = data_listener.accept().unwrap();
            control.write_all(b"550 Not Found\r\n").unwrap();
        });

        let mut engine = engine();
        let report = engine
            .download(&mut peer.control, "report.txt", || -> io::Result<Vec<u8>> {
                panic!("sink must not be opened for a refused download")
            })
            .unwrap();
        assert!(report.is_rejected());
        assert_eq!(report.outcome().code(), 550);
        assert_eq!(report.bytes, 0);
        assert!(!engine.negotiator().has_pending());

        assert_eq!(peer.finish(), vec!["PASV", "RETR report.txt"]);
    }

    #[test]
    fn test_upload_half_closes_data_connection() {
        let uploaded = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&uploaded);
        let mut peer = PassivePeer::start(move |_, data_listener, control| {
            let (mut data, _) = data_listener.accept().unwrap();
            control.write_all(b"150 Ok to send data\r\n").unwrap();
            let mut body = Vec::new();
            data.read_to_end(&mut body).unwrap();
            store.lock().unwrap().extend(body);
            control.write_all(b"226 Transfer complete\r\n").unwrap();
        });

        let content: Vec<u8> = (0..100u8).collect();
        let report = engine()
            .upload(&mut peer.control, "up.bin", &mut Cursor::new(content.clone()))
            .unwrap();
        assert_eq!(report.bytes, 100);
        assert_eq!(report.outcome().code(), 226);
        assert_eq!(*uploaded.lock().unwrap(), content);

        assert_eq!(peer.finish(), vec!["PASV", "STOR up.bin"]);
    }

    #[test]
    fn test_sink_failure_still_reads_completion() {
        let mut peer = PassivePeer::start(|_, data_listener, control| {
            let (mut data, _) = data_listener.accept().unwrap();
            control.write_all(b"150 Opening BINARY mode data connection\r\n").unwrap();
            let _ = data.write_all(b"bytes");
            drop(data);
            control.write_all(b"426 Connection closed; transfer aborted\r\n").unwrap();
        });

        let result = engine().download(&mut peer.control, "a.bin", || -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        });
        match result {
            Err(FtpClientError::TransferAborted { error, reply }) => {
                assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
                assert_eq!(reply.unwrap().code(), 426);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(peer.control.is_connected());
        peer.finish();
    }

    /// Yields `prefix`, then fails.
    struct FailingSource {
        prefix: Cursor<Vec<u8>>,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.prefix.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "disk read failed")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_source_failure_closes_data_connection_and_reads_completion() {
        let uploaded = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&uploaded);
        let mut peer = PassivePeer::start(move |_, data_listener, control| {
            let (mut data, _) = data_listener.accept().unwrap();
            control.write_all(b"150 Ok to send data\r\n").unwrap();
            let mut body = Vec::new();
            data.read_to_end(&mut body).unwrap();
            store.lock().unwrap().extend(body);
            control.write_all(b"226 Transfer complete\r\n").unwrap();
        });

        let mut source = FailingSource {
            prefix: Cursor::new(b"first half".to_vec()),
        };
        let result = engine().upload(&mut peer.control, "half.txt", &mut source);
        match result {
            Err(FtpClientError::TransferAborted { error, reply }) => {
                assert_eq!(error.kind(), io::ErrorKind::Other);
                // The socket closes normally, so the server stores what it got.
                assert_eq!(reply.unwrap().code(), 226);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*uploaded.lock().unwrap(), b"first half");
        assert!(peer.control.is_connected());
        assert_eq!(peer.finish(), vec!["PASV", "STOR half.txt"]);
    }

    #[test]
    fn test_125_also_opens_transfer() {
        let mut peer = PassivePeer::start(|_, data_listener, control| {
            let (mut data, _) = data_listener.accept().unwrap();
            control.write_all(b"125 Data connection already open\r\n").unwrap();
            data.write_all(b"a.txt\r\nb.txt\r\n").unwrap();
            drop(data);
            control.write_all(b"226 Transfer complete\r\n").unwrap();
        });

        let mut sink = Vec::new();
        let report = engine()
            .list(&mut peer.control, Command::NLST(None), &mut sink)
            .unwrap();
        assert!(!report.is_rejected());
        assert_eq!(sink, b"a.txt\r\nb.txt\r\n");
        assert_eq!(peer.finish(), vec!["PASV", "NLST"]);
    }
}
