//! Shell command parsing
//!
//! Turns a line typed at the `ftp>` prompt into a `ShellCommand`.

/// A command entered in the interactive shell.
#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Open { host: String, port: Option<u16> },
    Login { user: Option<String>, pass: Option<String> },
    List(Option<String>),
    NameList(Option<String>),
    Get { remote: String, local: Option<String> },
    Put { local: String, remote: Option<String> },
    Cd(String),
    Pwd,
    Ascii,
    Binary,
    Passive,
    Active,
    Delete(String),
    Rename { from: Option<String>, to: Option<String> },
    Close,
    Quit,
    Help,
    /// Known command with missing or invalid arguments; holds the usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Parse raw input into a ShellCommand
pub fn parse_command(raw: &str) -> ShellCommand {
    let mut parts = raw.split_whitespace();
    let action = parts.next().unwrap_or("help").to_ascii_lowercase();
    let args: Vec<String> = parts.map(str::to_string).collect();
    let arg = |i: usize| args.get(i).cloned();

    match (action.as_str(), args.len()) {
        ("open", 1 | 2) => match arg(1).map(|p| p.parse::<u16>()) {
            Some(Err(_)) => ShellCommand::Usage("open <hostname> [port]"),
            port => ShellCommand::Open {
                host: args[0].clone(),
                port: port.and_then(Result::ok),
            },
        },
        ("open", _) => ShellCommand::Usage("open <hostname> [port]"),
        ("user" | "login", 0..=2) => ShellCommand::Login {
            user: arg(0),
            pass: arg(1),
        },
        ("ls" | "dir", 0 | 1) => ShellCommand::List(arg(0)),
        ("nlist" | "nls", 0 | 1) => ShellCommand::NameList(arg(0)),
        ("get", 1 | 2) => ShellCommand::Get {
            remote: args[0].clone(),
            local: arg(1),
        },
        ("get", _) => ShellCommand::Usage("get <remote-file> [local-file]"),
        ("put", 1 | 2) => ShellCommand::Put {
            local: args[0].clone(),
            remote: arg(1),
        },
        ("put", _) => ShellCommand::Usage("put <local-file> [remote-file]"),
        ("cd", 1) => ShellCommand::Cd(args[0].clone()),
        ("cd", _) => ShellCommand::Usage("cd <remote-directory>"),
        ("pwd", 0) => ShellCommand::Pwd,
        ("ascii", 0) => ShellCommand::Ascii,
        ("binary", 0) => ShellCommand::Binary,
        ("passive", 0) => ShellCommand::Passive,
        ("active", 0) => ShellCommand::Active,
        ("delete", 1) => ShellCommand::Delete(args[0].clone()),
        ("delete", _) => ShellCommand::Usage("delete <remote-file>"),
        ("rename", 0 | 2) => ShellCommand::Rename {
            from: arg(0),
            to: arg(1),
        },
        ("rename", _) => ShellCommand::Usage("rename [<from> <to>]"),
        ("close" | "disconnect", 0) => ShellCommand::Close,
        ("quit" | "bye", _) => ShellCommand::Quit,
        ("help" | "?", _) => ShellCommand::Help,
        _ => ShellCommand::Unknown(raw.trim().to_string()),
    }
}
