//! # postbox-mime
//!
//! Builds the MIME payload of an outgoing email.
//!
//! ## Features
//!
//! - **Message description**: [`Email`] with `to`/`cc`/`bcc` lists and an
//!   optional [`Attachment`]
//! - **Injection guard**: addresses and header values containing CR or LF are
//!   rejected before anything is written
//! - **Assembly**: byte-exact `multipart/mixed` output with a text part and an
//!   optional base64 attachment folded at 76 characters
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_mime::{Attachment, Email, FsSource, assemble};
//!
//! let email = Email::builder()
//!     .from("sender@example.com")
//!     .to(["recipient@example.com"])
//!     .bcc(["archive@example.com"])
//!     .subject("Report")
//!     .body("Please find the report attached.")
//!     .attachment(Attachment::file("report.pdf", "application/pdf"))
//!     .build();
//!
//! let payload = assemble(&email, &FsSource::new())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod assemble;
mod content_type;
mod email;
mod error;
mod header;
mod source;

pub mod encoding;

pub use address::{Role, has_line_break, validate_address, validate_email, validate_header};
pub use assemble::{DEFAULT_BOUNDARY, assemble, boundary_for};
pub use content_type::ContentType;
pub use email::{Attachment, Email, EmailBuilder};
pub use error::{Error, Result};
pub use header::Headers;
pub use source::{AttachmentSource, FsSource};
