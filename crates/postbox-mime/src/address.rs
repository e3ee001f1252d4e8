//! Envelope address validation.
//!
//! RFC 5321 forbids CR and LF inside a command line, so any address (or
//! header value) carrying them could smuggle extra commands or headers onto
//! the wire. This is the only check performed; mailbox syntax is left to
//! the server.

use std::fmt;

use crate::email::Email;
use crate::error::{Error, Result};

/// The participant list an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sender.
    From,
    /// Primary recipient.
    To,
    /// Carbon-copy recipient.
    Cc,
    /// Blind-carbon-copy recipient.
    Bcc,
}

impl Role {
    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if the line contains CR or LF.
#[must_use]
pub fn has_line_break(line: &str) -> bool {
    line.contains(['\r', '\n'])
}

/// Validates a single address.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the address contains CR or LF.
pub fn validate_address(role: Role, address: &str) -> Result<()> {
    if has_line_break(address) {
        return Err(Error::InvalidAddress {
            role,
            address: address.to_string(),
            reason: "a line must not contain CR or LF",
        });
    }
    Ok(())
}

/// Validates a header value that is not an address.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the value contains CR or LF.
pub fn validate_header(field: &'static str, value: &str) -> Result<()> {
    if has_line_break(value) {
        return Err(Error::InvalidHeader { field });
    }
    Ok(())
}

/// Validates every participant address of a message.
///
/// Checks the sender, then `to`, `cc` and `bcc` in order, and stops at the
/// first invalid address.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] naming the role of the first bad address.
pub fn validate_email(email: &Email) -> Result<()> {
    if email.from().is_empty() {
        return Err(Error::InvalidAddress {
            role: Role::From,
            address: String::new(),
            reason: "sender must not be empty",
        });
    }
    validate_address(Role::From, email.from())?;

    let lists = [
        (Role::To, email.to()),
        (Role::Cc, email.cc()),
        (Role::Bcc, email.bcc()),
    ];
    for (role, addresses) in lists {
        for address in addresses {
            validate_address(role, address)?;
        }
    }

    Ok(())
}
