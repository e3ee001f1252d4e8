//! SMTP reply parser (RFC 5321 §4.2).

use std::mem;

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Maximum number of lines in one reply.
pub const MAX_REPLY_LINES: usize = 256;

/// One line of a reply: `250-text` or `250 text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Three-digit reply code.
    pub code: u16,
    /// True for the final line of the reply.
    pub last: bool,
    /// Text after the separator.
    pub text: &'a str,
}

impl<'a> ReplyLine<'a> {
    /// Parses a single line with its line ending already removed.
    ///
    /// A bare code with no separator is a final line with empty text.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not start with three digits followed
    /// by `-`, a space, or nothing.
    pub fn parse(line: &'a str) -> Result<Self> {
        let malformed = || Error::Protocol(format!("Malformed reply line: {line:?}"));

        let digits = line.get(..3).ok_or_else(malformed)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let code = digits.parse().map_err(|_| malformed())?;

        let (last, text) = match line.as_bytes().get(3) {
            None => (true, ""),
            Some(b' ') => (true, &line[4..]),
            Some(b'-') => (false, &line[4..]),
            Some(_) => return Err(malformed()),
        };

        Ok(Self { code, last, text })
    }
}

/// Collects reply lines until the final one arrives.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    code: Option<u16>,
    message: Vec<String>,
}

impl ReplyAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line, returning the complete reply once its final line is seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is malformed, its code differs from the
    /// earlier lines of the same reply, or the reply grows past
    /// [`MAX_REPLY_LINES`].
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>> {
        let parsed = ReplyLine::parse(line)?;
        if self.message.len() >= MAX_REPLY_LINES {
            return Err(Error::Protocol(format!(
                "Reply exceeds {MAX_REPLY_LINES} lines"
            )));
        }
        match self.code {
            Some(code) if code != parsed.code => {
                return Err(Error::Protocol(format!(
                    "Reply code changed from {code} to {} mid-reply",
                    parsed.code
                )));
            }
            _ => self.code = Some(parsed.code),
        }
        self.message.push(parsed.text.to_string());

        if !parsed.last {
            return Ok(None);
        }
        self.code = None;
        Ok(Some(Reply::new(
            ReplyCode::new(parsed.code),
            mem::take(&mut self.message),
        )))
    }
}

/// Parses a complete reply from its lines.
///
/// # Errors
///
/// Returns an error if a line is malformed, the codes disagree, or the last
/// line is missing.
pub fn parse_reply<S: AsRef<str>>(lines: &[S]) -> Result<Reply> {
    let mut acc = ReplyAccumulator::new();
    for (i, line) in lines.iter().enumerate() {
        if let Some(reply) = acc.push(line.as_ref())? {
            if i + 1 != lines.len() {
                return Err(Error::Protocol("Lines after final reply line".into()));
            }
            return Ok(reply);
        }
    }
    Err(Error::Protocol("Incomplete reply".into()))
}
