//! RAX FTP Client - Entry Point
//!
//! Interactive FTP client implementing the client side of RFC 959.

use log::{error, info};
use std::process;

use rax_ftp_client::utils::logging::setup_logging;
use rax_ftp_client::{ClientConfig, Session, Terminal};

fn main() {
    setup_logging();

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    info!("Starting FTP client");
    let session = Session::new(&config);
    let mut terminal = Terminal::new(session, config);

    if let Err(e) = terminal.run_interactive() {
        error!("Terminal error: {}", e);
        process::exit(1);
    }
}
