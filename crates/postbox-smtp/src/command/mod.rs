//! SMTP commands and DATA encoding.

use std::fmt;

use crate::types::{Address, AuthMechanism};

/// Optional `MAIL FROM` parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailParams {
    /// Declared message size (`SIZE=`, RFC 1870).
    pub size: Option<usize>,
    /// Declare `BODY=8BITMIME` (RFC 6152).
    pub eight_bit_mime: bool,
}

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO with the client hostname
    Helo(String),
    /// EHLO with the client hostname
    Ehlo(String),
    /// STARTTLS
    StartTls,
    /// AUTH with an optional SASL initial response
    Auth(AuthMechanism, Option<String>),
    /// Continuation line of a SASL exchange
    AuthResponse(String),
    /// MAIL FROM
    MailFrom(Address, MailParams),
    /// RCPT TO
    RcptTo(Address),
    /// DATA
    Data,
    /// RSET
    Rset,
    /// NOOP
    Noop,
    /// QUIT
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo(host) => write!(f, "HELO {host}"),
            Self::Ehlo(host) => write!(f, "EHLO {host}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth(mechanism, None) => write!(f, "AUTH {}", mechanism.as_str()),
            Self::Auth(mechanism, Some(initial)) => {
                write!(f, "AUTH {} {initial}", mechanism.as_str())
            }
            Self::AuthResponse(data) => f.write_str(data),
            Self::MailFrom(from, params) => {
                write!(f, "MAIL FROM:<{from}>")?;
                if params.eight_bit_mime {
                    f.write_str(" BODY=8BITMIME")?;
                }
                if let Some(size) = params.size {
                    write!(f, " SIZE={size}")?;
                }
                Ok(())
            }
            Self::RcptTo(to) => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Rset => f.write_str("RSET"),
            Self::Noop => f.write_str("NOOP"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl Command {
    /// Serializes the command line, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// Renders the command for logs with credentials masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth(mechanism, Some(_)) => format!("AUTH {} <redacted>", mechanism.as_str()),
            Self::AuthResponse(_) => "<redacted>".to_string(),
            other => other.to_string(),
        }
    }
}

/// Encodes a message for the DATA phase.
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// dot-stuffed (RFC 5321 §4.5.2) and the terminating `.` line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 8);

    if !message.is_empty() {
        let body = message.strip_suffix(b"\n").unwrap_or(message);
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
