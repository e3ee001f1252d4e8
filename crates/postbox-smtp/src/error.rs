//! Error types for SMTP operations.

use std::fmt;
use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The step of a connection or transaction that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Address validation.
    Validate,
    /// Payload assembly.
    Assemble,
    /// TCP (or implicit TLS) connection.
    Dial,
    /// Server greeting.
    Greeting,
    /// EHLO/HELO.
    Ehlo,
    /// STARTTLS negotiation.
    Tls,
    /// Authentication.
    Auth,
    /// MAIL FROM.
    Mail,
    /// RCPT TO.
    Rcpt,
    /// DATA and message transfer.
    Data,
}

impl Phase {
    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Assemble => "assemble",
            Self::Dial => "dial",
            Self::Greeting => "greeting",
            Self::Ehlo => "ehlo",
            Self::Tls => "tls",
            Self::Auth => "auth",
            Self::Mail => "mail",
            Self::Rcpt => "rcpt",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An address was rejected locally (CR/LF injection, empty sender, no recipients).
    InvalidAddress,
    /// A subject or attachment field was rejected locally.
    InvalidHeader,
    /// Declared attachment bytes were unavailable.
    AttachmentRead,
    /// Dial, TLS or connection failure.
    Transport,
    /// The server rejected a command or answered unexpectedly.
    Protocol,
    /// An operation was called in the wrong session state.
    Precondition,
}

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Message validation or assembly error.
    #[error(transparent)]
    Mime(#[from] postbox_mime::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection while a reply was expected.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// The host is not a valid TLS server name.
    #[error("Invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The message has no envelope recipients.
    #[error("Message has no recipients")]
    NoRecipients,

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Credentials would be sent in clear text.
    #[error("Refusing to send credentials over an unencrypted connection to {0}")]
    InsecureAuth(String),

    /// Message too large for the server's advertised SIZE.
    #[error("Message exceeds size limit: {size} bytes (server accepts {limit})")]
    MessageTooLarge {
        /// Payload size.
        size: usize,
        /// Advertised limit.
        limit: usize,
    },

    /// `send` was called before a successful `connect`.
    #[error("Session is not connected, call connect() first")]
    NotConnected,

    /// A recipient was rejected by the server.
    #[error("Recipient {address} rejected: {source}")]
    Recipient {
        /// The rejected address.
        address: String,
        /// Server response.
        #[source]
        source: Box<Error>,
    },

    /// An error annotated with the phase that produced it.
    #[error("{phase} error: {source}")]
    Step {
        /// Failing phase.
        phase: Phase,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Wraps the error with the phase that produced it.
    #[must_use]
    pub fn in_phase(self, phase: Phase) -> Self {
        Self::Step {
            phase,
            source: Box::new(self),
        }
    }

    /// Returns the outermost phase annotation, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Step { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Returns the innermost error, looking through phase and recipient wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Step { source, .. } | Self::Recipient { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the rejected recipient address, if a recipient was refused.
    #[must_use]
    pub fn rejected_recipient(&self) -> Option<&str> {
        match self {
            Self::Recipient { address, .. } => Some(address),
            Self::Step { source, .. } => source.rejected_recipient(),
            _ => None,
        }
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Mime(postbox_mime::Error::InvalidAddress { .. })
            | Self::InvalidAddress(_)
            | Self::NoRecipients => ErrorKind::InvalidAddress,
            Self::Mime(postbox_mime::Error::InvalidHeader { .. }) => ErrorKind::InvalidHeader,
            Self::Mime(postbox_mime::Error::AttachmentRead { .. }) => ErrorKind::AttachmentRead,
            Self::Io(_) | Self::ConnectionClosed | Self::InvalidServerName(_) => {
                ErrorKind::Transport
            }
            Self::NotConnected => ErrorKind::Precondition,
            _ => ErrorKind::Protocol,
        }
    }

    /// Returns the server reply code, if the server rejected a command.
    #[must_use]
    pub fn reply_code(&self) -> Option<u16> {
        match self.root() {
            Self::SmtpError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.reply_code().is_some_and(|code| (500..600).contains(&code))
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.reply_code().is_some_and(|code| (400..500).contains(&code))
    }
}
