//! # postbox-smtp
//!
//! Async SMTP submission client for messages built with [`postbox_mime`].
//!
//! ## Features
//!
//! - **Sessions**: [`Session`] keeps one connection open across many sends
//! - **One-shot**: [`send()`] dials, delivers one message and disconnects
//! - **Sharing**: [`Mailer`] serializes access to one or a pool of sessions
//! - **TLS**: implicit TLS or STARTTLS whenever the server offers it
//! - **Authentication**: PLAIN and LOGIN, never over plaintext to a remote host
//! - **Type-state client**: [`Client`] enforces the SMTP command order at
//!   compile time
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_smtp::{Email, ServerConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> postbox_smtp::Result<()> {
//!     let config = ServerConfig::new("smtp.example.com", 587)
//!         .credentials("user@example.com", "password");
//!
//!     let mut session = Session::new(config);
//!     session.connect().await?;
//!
//!     let email = Email::builder()
//!         .from("user@example.com")
//!         .to(["friend@example.org"])
//!         .subject("Hello")
//!         .body("hello")
//!         .build();
//!     session.send(&email).await?;
//!
//!     session.disconnect().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() / auth_login() / skip_auth() ───→ Ready
//! └──────────────┘
//!
//! Ready ─── mail_from() ───→ MailTransaction ───→ RecipientAdded ───→ Data
//!   ↑                                                                   │
//!   └──────────────────────── send_message() ───────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders and DATA encoding
//! - [`connection`]: Transports and the type-state client
//! - [`parser`]: Reply parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
mod config;
pub mod connection;
mod error;
mod mailer;
pub mod parser;
mod send;
mod session;
mod transaction;
pub mod types;

pub use command::MailParams;
pub use config::{Security, ServerConfig};
pub use connection::{
    Client, Connected, Connector, Data, MailTransaction, Ready, RecipientAdded,
    ServerInfo, SmtpConnection, SmtpStream, TcpConnector, TransactionError, Transport,
};
pub use error::{Error, ErrorKind, Phase, Result};
pub use mailer::Mailer;
pub use postbox_mime::{Attachment, AttachmentSource, Email, FsSource};
pub use send::{send, send_with};
pub use session::Session;
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
