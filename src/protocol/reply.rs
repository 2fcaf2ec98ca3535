//! Server replies
//!
//! A `Reply` is one complete, possibly multi-line, answer from the server.

use std::fmt;

/// A complete FTP reply.
///
/// `lines` holds the reply text without the leading code and separator for
/// the opening and closing lines; intermediate lines of a multi-line reply
/// are kept exactly as received. `raw` is the verbatim text (CRLF included)
/// for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
    is_final: bool,
    raw: String,
}

impl Reply {
    /// Builds a reply, rendering the wire form from `lines`.
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        let raw = match lines.as_slice() {
            [] => format!("{code} \r\n"),
            [only] => format!("{code} {only}\r\n"),
            [first, body @ .., last] => {
                let mut raw = format!("{code}-{first}\r\n");
                for line in body {
                    raw.push_str(line);
                    raw.push_str("\r\n");
                }
                raw.push_str(&format!("{code} {last}\r\n"));
                raw
            }
        };
        Self::with_raw(code, lines, raw)
    }

    pub(crate) fn with_raw(code: u16, lines: Vec<String>, raw: String) -> Self {
        Self {
            code,
            lines,
            is_final: code >= 200,
            raw,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// False only for 1xx preliminary replies.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// The reply exactly as the server sent it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Reply text with lines joined by `\n`.
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw.trim_end())
    }
}
