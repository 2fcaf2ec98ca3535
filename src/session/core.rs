//! Module `core`
//!
//! The `Session` facade: one control connection, the transfer engine, and
//! the state that belongs to a single logical user of the server.

use log::info;
use std::path::Path;

use crate::config::ClientConfig;
use crate::control::ControlChannel;
use crate::error::{FtpClientError, Result};
use crate::protocol::{Command, Reply, responses};
use crate::session::{LoginResult, RenameResult};
use crate::storage::{LocalFiles, StdFileSystem};
use crate::transfer::{
    DataChannelNegotiator, DataMode, ListResult, TransferEngine, TransferMode, TransferReport,
};

/// A client session with at most one FTP server.
///
/// Not thread-safe; callers issue one operation at a time. Every operation
/// other than `open` fails with `NotConnected` before touching a socket when
/// no control connection exists, including after the server dropped it.
pub struct Session {
    control: ControlChannel,
    engine: TransferEngine,
    transfer_mode: TransferMode,
    host: Option<String>,
    files: Box<dyn LocalFiles>,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_files(config, Box::new(StdFileSystem))
    }

    /// A session reading and writing local files through `files`.
    pub fn with_files(config: &ClientConfig, files: Box<dyn LocalFiles>) -> Self {
        let negotiator = DataChannelNegotiator::new(config.data_mode)
            .with_accept_timeout(config.accept_timeout())
            .with_active_endpoint(config.active_ip(), config.active_port);

        Self {
            control: ControlChannel::with_timeouts(
                config.connect_timeout(),
                config.control_timeout(),
            ),
            engine: TransferEngine::new(negotiator).with_buffer_size(config.buffer_size),
            transfer_mode: TransferMode::default(),
            host: None,
            files,
        }
    }

    // --------------------
    // State
    // --------------------

    pub fn is_connected(&self) -> bool {
        self.control.is_connected()
    }

    /// Host given to `open`, while the connection is alive.
    pub fn host(&self) -> Option<&str> {
        if self.control.is_connected() {
            self.host.as_deref()
        } else {
            None
        }
    }

    /// Representation type last accepted by the server.
    pub fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    pub fn data_mode(&self) -> DataMode {
        self.engine.negotiator().mode()
    }

    /// Selects passive or active data connections for later transfers.
    pub fn set_data_mode(&mut self, mode: DataMode) {
        info!("Data connection mode set to {}", mode);
        self.engine.negotiator_mut().set_mode(mode);
    }

    // --------------------
    // Connection
    // --------------------

    /// Connects to `host:port` and returns the greeting.
    pub fn open(&mut self, host: &str, port: u16) -> Result<Reply> {
        if self.control.is_connected() {
            let current = self.host.clone().unwrap_or_default();
            return Err(FtpClientError::AlreadyConnected(current));
        }

        let greeting = self.control.connect(host, port)?;
        self.host = Some(host.to_string());
        self.transfer_mode = TransferMode::default();
        Ok(greeting)
    }

    /// Sends `OPTS UTF8 ON`.
    pub fn enable_utf8(&mut self) -> Result<Reply> {
        self.send(Command::utf8_on())
    }

    /// Sends `USER`, then `PASS` if the server asks for a password.
    pub fn login(&mut self, user: &str, pass: &str) -> Result<LoginResult> {
        let user_reply = self.send(Command::USER(user.to_string()))?;
        let pass_reply = if user_reply.is_intermediate() {
            Some(self.send(Command::PASS(pass.to_string()))?)
        } else {
            None
        };

        let result = LoginResult {
            user: user_reply,
            pass: pass_reply,
        };
        if result.is_logged_in() {
            info!("Logged in as {}", user);
        }
        Ok(result)
    }

    /// Sends `QUIT` and closes the control connection.
    pub fn quit(&mut self) -> Result<Reply> {
        let reply = self.send(Command::QUIT);
        self.disconnect();
        reply
    }

    /// Closes the control connection without sending `QUIT`.
    pub fn disconnect(&mut self) {
        self.engine.negotiator_mut().release();
        self.control.disconnect();
        self.host = None;
    }

    // --------------------
    // Transfers
    // --------------------

    /// Full directory listing (`LIST`).
    pub fn list(&mut self, dir: Option<&str>) -> Result<ListResult> {
        self.listing(Command::LIST(dir.map(str::to_string)))
    }

    /// Bare file names (`NLST`).
    pub fn name_list(&mut self, dir: Option<&str>) -> Result<ListResult> {
        self.listing(Command::NLST(dir.map(str::to_string)))
    }

    /// Retrieves `remote` into `local`. The local file is only created once
    /// the server accepts the request; a failed transfer leaves whatever was
    /// written so far in place.
    pub fn download(&mut self, remote: &str, local: &Path) -> Result<TransferReport> {
        self.ensure_connected()?;
        let files = &self.files;
        let result = self
            .engine
            .download(&mut self.control, remote, || files.create(local));
        self.track_connection();
        result
    }

    /// Stores the existing local file `local` as `remote`.
    pub fn upload(&mut self, local: &Path, remote: &str) -> Result<TransferReport> {
        self.ensure_connected()?;
        if !self.files.exists(local) {
            return Err(FtpClientError::LocalFileNotFound(local.to_path_buf()));
        }

        let mut source = self.files.open(local)?;
        let result = self.engine.upload(&mut self.control, remote, &mut source);
        self.track_connection();
        result
    }

    // --------------------
    // Simple commands
    // --------------------

    pub fn change_dir(&mut self, dir: &str) -> Result<Reply> {
        self.send(Command::CWD(dir.to_string()))
    }

    pub fn pwd(&mut self) -> Result<Reply> {
        self.send(Command::PWD)
    }

    /// Sends `TYPE A` or `TYPE I`; the recorded mode changes only if the
    /// server accepts it.
    pub fn set_mode(&mut self, mode: TransferMode) -> Result<Reply> {
        let reply = self.send(Command::TYPE(mode))?;
        if reply.is_completion() {
            self.transfer_mode = mode;
        }
        Ok(reply)
    }

    pub fn delete(&mut self, name: &str) -> Result<Reply> {
        self.send(Command::DELE(name.to_string()))
    }

    /// Sends `RNFR`, and `RNTO` only when the server answers 350.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<RenameResult> {
        let from_reply = self.send(Command::RNFR(from.to_string()))?;
        let to_reply = if from_reply.code() == responses::FILE_ACTION_PENDING {
            Some(self.send(Command::RNTO(to.to_string()))?)
        } else {
            None
        };

        Ok(RenameResult {
            from: from_reply,
            to: to_reply,
        })
    }

    // --------------------
    // Helpers
    // --------------------

    fn listing(&mut self, command: Command) -> Result<ListResult> {
        self.ensure_connected()?;
        let mut sink = Vec::new();
        let result = self.engine.list(&mut self.control, command, &mut sink);
        self.track_connection();

        Ok(ListResult {
            report: result?,
            listing: String::from_utf8_lossy(&sink).into_owned(),
        })
    }

    fn send(&mut self, command: Command) -> Result<Reply> {
        self.ensure_connected()?;
        let reply = self.control.send(&command);
        self.track_connection();
        reply
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.control.is_connected() {
            Ok(())
        } else {
            self.host = None;
            Err(FtpClientError::NotConnected)
        }
    }

    /// Forgets the host once the control connection has been lost.
    fn track_connection(&mut self) {
        if !self.control.is_connected() && self.host.is_some() {
            info!("Session to {} ended", self.host.as_deref().unwrap_or_default());
            self.host = None;
        }
    }
}
