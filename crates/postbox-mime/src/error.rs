//! Error types for message assembly.

use std::io;

use crate::address::Role;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An address is empty or contains CR or LF.
    #[error("{role} address error: {reason}: {address:?}")]
    InvalidAddress {
        /// Which participant list the address came from.
        role: Role,
        /// The offending address.
        address: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A header value contains CR or LF.
    #[error("Invalid header value for {field}: a line must not contain CR or LF")]
    InvalidHeader {
        /// Header or descriptor field that was rejected.
        field: &'static str,
    },

    /// The attachment bytes could not be read.
    #[error("Failed to read attachment {name:?}: {source}")]
    AttachmentRead {
        /// Declared attachment name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
