//! Terminal module for RAX FTP Client
//!
//! Prompt loop: reads commands, calls the session, prints every reply.

use log::{debug, info};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::handlers::handle_error;
use crate::error::{FtpClientError, Result};
use crate::protocol::Reply;
use crate::session::Session;
use crate::terminal::parser::{ShellCommand, parse_command};
use crate::transfer::{DataMode, TransferMode, TransferReport};

const HELP: &str = "Commands: open, user, login, ls, nlist, get, put, cd, pwd, ascii, binary, \
passive, active, delete, rename, close, disconnect, quit, bye";

/// Terminal handler for interactive FTP sessions
pub struct Terminal {
    session: Session,
    config: ClientConfig,
}

impl Terminal {
    pub fn new(session: Session, config: ClientConfig) -> Self {
        Self { session, config }
    }

    /// Run the interactive FTP session until `quit` or end of input
    pub fn run_interactive(&mut self) -> io::Result<()> {
        println!("RAX FTP Client\nType 'help' for a list of commands.");

        if let Some(host) = self.config.default_host.clone() {
            self.report(|terminal| terminal.open(&host, None));
        }

        let stdin = io::stdin();
        let mut input = stdin.lock();
        loop {
            print!("ftp> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            debug!("User entered command: {}", line.trim());

            let command = parse_command(&line);
            if command == ShellCommand::Quit {
                break;
            }
            self.report(|terminal| terminal.execute(command, &mut input));
        }

        if self.session.is_connected() {
            self.report(|terminal| print_reply(terminal.session.quit()));
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Runs `action` and prints any error it returns.
    fn report<F>(&mut self, action: F)
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if let Err(e) = action(self) {
            handle_error(&e);
            if let FtpClientError::TransferAborted {
                reply: Some(reply), ..
            } = &e
            {
                println!("{}", reply);
            }
            println!("Error: {}", e);
        }
    }

    fn execute(&mut self, command: ShellCommand, input: &mut impl BufRead) -> Result<()> {
        match command {
            ShellCommand::Open { host, port } => {
                self.open(&host, port)?;
                self.prompt_login(input)
            }
            ShellCommand::Login { user, pass } => {
                let user = match user {
                    Some(user) => user,
                    None => prompt(input, "Username: ")?,
                };
                let pass = match pass {
                    Some(pass) => pass,
                    None => prompt(input, "Password: ")?,
                };
                self.login(&user, &pass)
            }
            ShellCommand::List(dir) => {
                let result = self.session.list(dir.as_deref())?;
                self.print_listing(&result.report, &result.listing);
                Ok(())
            }
            ShellCommand::NameList(dir) => {
                let result = self.session.name_list(dir.as_deref())?;
                self.print_listing(&result.report, &result.listing);
                Ok(())
            }
            ShellCommand::Get { remote, local } => {
                let local = local.unwrap_or_else(|| file_name(&remote));
                let report = self.session.download(&remote, Path::new(&local))?;
                print_transfer(&report);
                if !report.is_rejected() {
                    println!("{} has been downloaded ({} bytes).", local, report.bytes);
                }
                Ok(())
            }
            ShellCommand::Put { local, remote } => {
                let remote = remote.unwrap_or_else(|| file_name(&local));
                let report = self.session.upload(Path::new(&local), &remote)?;
                print_transfer(&report);
                if !report.is_rejected() {
                    println!("{} has been uploaded ({} bytes).", local, report.bytes);
                }
                Ok(())
            }
            ShellCommand::Cd(dir) => print_reply(self.session.change_dir(&dir)),
            ShellCommand::Pwd => print_reply(self.session.pwd()),
            ShellCommand::Ascii => print_reply(self.session.set_mode(TransferMode::Ascii)),
            ShellCommand::Binary => print_reply(self.session.set_mode(TransferMode::Binary)),
            ShellCommand::Passive => {
                self.session.set_data_mode(DataMode::Passive);
                println!("Passive mode on.");
                Ok(())
            }
            ShellCommand::Active => {
                self.session.set_data_mode(DataMode::Active);
                println!("Passive mode off.");
                Ok(())
            }
            ShellCommand::Delete(name) => print_reply(self.session.delete(&name)),
            ShellCommand::Rename { from, to } => {
                let (from, to) = match (from, to) {
                    (Some(from), Some(to)) => (from, to),
                    _ => (prompt(input, "From name: ")?, prompt(input, "To name: ")?),
                };
                let result = self.session.rename(&from, &to)?;
                println!("{}", result.from);
                if let Some(to) = &result.to {
                    println!("{}", to);
                }
                Ok(())
            }
            ShellCommand::Close => print_reply(self.session.quit()),
            // The prompt loop stops before executing `quit`.
            ShellCommand::Quit => Ok(()),
            ShellCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ShellCommand::Usage(usage) => {
                println!("Usage: {}", usage);
                Ok(())
            }
            ShellCommand::Unknown(_) => {
                println!("Unknown command. Type 'help' for a list of commands.");
                Ok(())
            }
        }
    }

    fn open(&mut self, host: &str, port: Option<u16>) -> Result<()> {
        let port = port.unwrap_or(self.config.default_port);
        info!("Opening connection to {}:{}", host, port);
        println!("{}", self.session.open(host, port)?);

        if self.config.send_utf8_opts {
            println!("{}", self.session.enable_utf8()?);
        }
        Ok(())
    }

    fn prompt_login(&mut self, input: &mut impl BufRead) -> Result<()> {
        let host = self.session.host().unwrap_or_default().to_string();
        let user = prompt(input, &format!("User ({}:(none)): ", host))?;
        if user.is_empty() {
            return Ok(());
        }
        let pass = prompt(input, "Password: ")?;
        self.login(&user, &pass)
    }

    fn login(&mut self, user: &str, pass: &str) -> Result<()> {
        let result = self.session.login(user, pass)?;
        println!("{}", result.user);
        match &result.pass {
            Some(reply) => println!("{}", reply),
            None if !result.is_logged_in() => println!("Login failed."),
            None => {}
        }
        Ok(())
    }

    fn print_listing(&self, report: &TransferReport, listing: &str) {
        println!("{}", report.negotiation);
        println!("{}", report.preliminary);
        print!("{}", listing);
        if let Some(completion) = &report.completion {
            println!("{}", completion);
        }
    }
}

fn print_reply(reply: Result<Reply>) -> Result<()> {
    println!("{}", reply?);
    Ok(())
}

fn print_transfer(report: &TransferReport) {
    for reply in report.replies() {
        println!("{}", reply);
    }
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Last path component, used as the default name on the other side.
fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
