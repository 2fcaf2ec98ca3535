//! Reply parsing
//!
//! Assembles complete replies from the raw byte stream of the control
//! connection. Lines end with CRLF. A line `NNN-text` opens a multi-line
//! reply which only a later `NNN text` line with the same code closes;
//! `NNN text` on its own is a complete reply.

use crate::error::{FtpClientError, Result};
use crate::protocol::Reply;

const CRLF: &[u8] = b"\r\n";

/// Incremental decoder for control-connection bytes.
///
/// Bytes following a completed reply stay buffered, so replies that arrive
/// in the same read are handed out one per call.
#[derive(Debug, Default)]
pub struct ReplyParser {
    buffer: Vec<u8>,
    open: Option<OpenReply>,
}

#[derive(Debug)]
struct OpenReply {
    code: u16,
    lines: Vec<String>,
    raw: String,
}

#[derive(Debug, PartialEq)]
enum Separator {
    Final,
    Continued,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns the next complete reply, if any.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<Reply>> {
        self.buffer.extend_from_slice(bytes);
        self.next_reply()
    }

    /// Returns the next complete reply from already buffered bytes.
    ///
    /// On `MalformedReply` the offending line and any partially assembled
    /// reply are discarded.
    pub fn next_reply(&mut self) -> Result<Option<Reply>> {
        while let Some(line) = self.take_line() {
            if let Some(reply) = self.consume_line(line)? {
                return Ok(Some(reply));
            }
        }
        Ok(None)
    }

    /// True while bytes or an unfinished multi-line reply are pending.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || self.open.is_some()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.open = None;
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.windows(CRLF.len()).position(|w| w == CRLF)?;
        let line: Vec<u8> = self.buffer.drain(..end + CRLF.len()).collect();
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }

    fn consume_line(&mut self, line: String) -> Result<Option<Reply>> {
        let Some(mut open) = self.open.take() else {
            let (code, separator, text) = split_status_line(&line)
                .ok_or_else(|| FtpClientError::MalformedReply(line.clone()))?;
            let lines = vec![text.to_string()];
            let raw = format!("{line}\r\n");
            return Ok(match separator {
                Separator::Final => Some(Reply::with_raw(code, lines, raw)),
                Separator::Continued => {
                    self.open = Some(OpenReply { code, lines, raw });
                    None
                }
            });
        };

        open.raw.push_str(&line);
        open.raw.push_str("\r\n");

        match split_status_line(&line) {
            Some((code, Separator::Final, text)) if code == open.code => {
                open.lines.push(text.to_string());
                Ok(Some(Reply::with_raw(open.code, open.lines, open.raw)))
            }
            Some((code, Separator::Final, _)) => Err(FtpClientError::MalformedReply(format!(
                "reply {} closed by {}: {}",
                open.code, code, line
            ))),
            Some((code, Separator::Continued, text)) if code == open.code => {
                open.lines.push(text.to_string());
                self.open = Some(open);
                Ok(None)
            }
            _ => {
                open.lines.push(line);
                self.open = Some(open);
                Ok(None)
            }
        }
    }
}

/// Splits `NNN text` / `NNN-text` into code, separator and text.
fn split_status_line(line: &str) -> Option<(u16, Separator, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = line[..3].parse().ok()?;
    match bytes.get(3) {
        None => Some((code, Separator::Final, "")),
        Some(b' ') => Some((code, Separator::Final, &line[4..])),
        Some(b'-') => Some((code, Separator::Continued, &line[4..])),
        Some(_) => None,
    }
}
