//! Scripted FTP server for integration tests.
//!
//! Runs on its own tokio runtime so the blocking client under test can talk
//! to it from the test thread. Files live in memory; every command line the
//! server receives is recorded.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;

pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";

/// How the server behaves beyond the defaults.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Files present when the server starts.
    pub files: Vec<(String, Vec<u8>)>,
    /// Number of active-mode transfers answered with 150 and then 425
    /// without ever connecting back.
    pub skip_connect_back: usize,
    /// Misbehaviour applied to every RETR of an existing file.
    pub retr_fault: Option<RetrFault>,
}

/// Ways a RETR can go wrong after the server accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrFault {
    /// Answer 150, never open the data connection, never send a final reply.
    SilentAfter150,
    /// Send this many bytes, reset the data connection, then answer 426.
    ResetDataAfter(usize),
    /// Send the whole file, then close the control connection instead of 226.
    HangUpBeforeCompletion,
}

impl Script {
    pub fn with_file(mut self, name: &str, content: &[u8]) -> Self {
        self.files.push((name.to_string(), content.to_vec()));
        self
    }
}

pub struct MockServer {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    _runtime: Runtime,
}

impl MockServer {
    pub fn start() -> Self {
        Self::start_with(Script::default())
    }

    pub fn start_with(script: Script) -> Self {
        let runtime = Runtime::new().unwrap();
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let commands = Arc::new(Mutex::new(Vec::new()));
        let files = Arc::new(Mutex::new(script.files.iter().cloned().collect()));

        let state = Shared {
            commands: Arc::clone(&commands),
            files: Arc::clone(&files),
            skip_connect_back: Arc::new(AtomicUsize::new(script.skip_connect_back)),
            retr_fault: script.retr_fault,
        };
        runtime.spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self {
            addr,
            commands,
            files,
            _runtime: runtime,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Command lines received so far, across all connections.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// True if any received command line starts with `prefix`.
    pub fn received(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

#[derive(Clone)]
struct Shared {
    commands: Arc<Mutex<Vec<String>>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    skip_connect_back: Arc<AtomicUsize>,
    retr_fault: Option<RetrFault>,
}

/// Where the next data connection comes from.
enum DataSetup {
    None,
    Passive(TcpListener),
    Active(SocketAddr),
}

impl DataSetup {
    async fn open(&mut self) -> std::io::Result<TcpStream> {
        match std::mem::replace(self, DataSetup::None) {
            DataSetup::Passive(listener) => Ok(listener.accept().await?.0),
            DataSetup::Active(addr) => TcpStream::connect(addr).await,
            DataSetup::None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no data connection negotiated",
            )),
        }
    }
}

async fn serve(stream: TcpStream, state: Shared) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    reply(&mut reader, "220-Mock FTP server\r\n220 Ready\r\n").await?;

    let mut data = DataSetup::None;
    let mut rename_from: Option<String> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end().to_string();
        state.commands.lock().unwrap().push(line.clone());

        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_string(), arg.to_string()),
            None => (line.clone(), String::new()),
        };

        match verb.as_str() {
            "USER" if arg == USER => reply(&mut reader, "331 Password required\r\n").await?,
            "USER" => reply(&mut reader, "530 Unknown user\r\n").await?,
            "PASS" if arg == PASSWORD => reply(&mut reader, "230 Login successful\r\n").await?,
            "PASS" => reply(&mut reader, "530 Login incorrect\r\n").await?,
            "OPTS" => reply(&mut reader, "200 Always in UTF8 mode\r\n").await?,
            "PWD" => reply(&mut reader, "257 \"/\" is the current directory\r\n").await?,
            "CWD" if arg == "hangup" => return Ok(()),
            "CWD" => reply(&mut reader, "250 Directory changed\r\n").await?,
            "TYPE" if arg == "A" || arg == "I" => {
                reply(&mut reader, &format!("200 Switching to {} mode\r\n", arg)).await?
            }
            "TYPE" => reply(&mut reader, "504 Type not supported\r\n").await?,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                data = DataSetup::Passive(listener);
                let text = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                    port >> 8,
                    port & 0xff
                );
                reply(&mut reader, &text).await?;
            }
            "PORT" => match parse_port(&arg) {
                Some(addr) => {
                    data = DataSetup::Active(addr);
                    reply(&mut reader, "200 PORT command successful\r\n").await?;
                }
                None => reply(&mut reader, "501 Illegal PORT command\r\n").await?,
            },
            "LIST" | "NLST" => {
                let listing = {
                    let files = state.files.lock().unwrap();
                    let mut names: Vec<_> = files.iter().collect();
                    names.sort();
                    names
                        .into_iter()
                        .map(|(name, content)| {
                            if verb == "LIST" {
                                format!("-rw-r--r-- 1 ftp ftp {} {}\r\n", content.len(), name)
                            } else {
                                format!("{}\r\n", name)
                            }
                        })
                        .collect::<String>()
                };
                send_data(&mut reader, &mut data, &state, listing.as_bytes()).await?;
            }
            "RETR" => {
                let content = state.files.lock().unwrap().get(&arg).cloned();
                match (content, state.retr_fault) {
                    (Some(_), Some(RetrFault::SilentAfter150)) => {
                        data = DataSetup::None;
                        reply(&mut reader, "150 Opening data connection\r\n").await?;
                    }
                    (Some(content), Some(RetrFault::ResetDataAfter(n))) => {
                        reply(&mut reader, "150 Opening data connection\r\n").await?;
                        let mut stream = data.open().await?;
                        stream.write_all(&content[..n.min(content.len())]).await?;
                        stream.flush().await?;
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        stream.set_linger(Some(Duration::ZERO))?;
                        drop(stream);
                        reply(&mut reader, "426 Connection closed; transfer aborted\r\n").await?;
                    }
                    (Some(content), Some(RetrFault::HangUpBeforeCompletion)) => {
                        reply(&mut reader, "150 Opening data connection\r\n").await?;
                        let mut stream = data.open().await?;
                        stream.write_all(&content).await?;
                        stream.shutdown().await?;
                        return Ok(());
                    }
                    (Some(content), None) => {
                        send_data(&mut reader, &mut data, &state, &content).await?
                    }
                    (None, _) => {
                        data = DataSetup::None;
                        reply(&mut reader, "550 Failed to open file\r\n").await?;
                    }
                }
            }
            "STOR" => {
                reply(&mut reader, "150 Ok to send data\r\n").await?;
                let mut stream = data.open().await?;
                let mut content = Vec::new();
                stream.read_to_end(&mut content).await?;
                state.files.lock().unwrap().insert(arg, content);
                reply(&mut reader, "226 Transfer complete\r\n").await?;
            }
            "DELE" => {
                let removed = state.files.lock().unwrap().remove(&arg).is_some();
                let text = if removed {
                    "250 Delete operation successful\r\n"
                } else {
                    "550 Delete operation failed\r\n"
                };
                reply(&mut reader, text).await?;
            }
            "RNFR" => {
                if state.files.lock().unwrap().contains_key(&arg) {
                    rename_from = Some(arg);
                    reply(&mut reader, "350 Ready for RNTO\r\n").await?;
                } else {
                    reply(&mut reader, "550 RNFR command failed\r\n").await?;
                }
            }
            "RNTO" => match rename_from.take() {
                Some(from) => {
                    {
                        let mut files = state.files.lock().unwrap();
                        if let Some(content) = files.remove(&from) {
                            files.insert(arg, content);
                        }
                    }
                    reply(&mut reader, "250 Rename successful\r\n").await?;
                }
                None => reply(&mut reader, "503 RNFR required first\r\n").await?,
            },
            "QUIT" => {
                reply(&mut reader, "221 Goodbye\r\n").await?;
                return Ok(());
            }
            _ => reply(&mut reader, "502 Command not implemented\r\n").await?,
        }
    }
}

async fn send_data(
    reader: &mut BufReader<TcpStream>,
    data: &mut DataSetup,
    state: &Shared,
    content: &[u8],
) -> std::io::Result<()> {
    let skip = matches!(data, DataSetup::Active(_))
        && state
            .skip_connect_back
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
    if skip {
        *data = DataSetup::None;
        return reply(
            reader,
            "150 Opening data connection\r\n425 Can't open data connection\r\n",
        )
        .await;
    }

    reply(reader, "150 Opening data connection\r\n").await?;
    let mut stream = data.open().await?;
    stream.write_all(content).await?;
    stream.shutdown().await?;
    drop(stream);
    reply(reader, "226 Transfer complete\r\n").await
}

async fn reply(reader: &mut BufReader<TcpStream>, text: &str) -> std::io::Result<()> {
    reader.get_mut().write_all(text.as_bytes()).await?;
    reader.get_mut().flush().await
}

fn parse_port(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u8> = arg
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    if parts.len() != 6 {
        return None;
    }
    let ip = std::net::Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (u16::from(parts[4]) << 8) | u16::from(parts[5]);
    Some(SocketAddr::from((ip, port)))
}
