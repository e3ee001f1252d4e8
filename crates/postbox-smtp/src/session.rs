//! Stateful SMTP session.
//!
//! A [`Session`] owns at most one connection. It moves between two states:
//!
//! ```text
//! Unconnected ── connect() ──→ Ready ── disconnect() ──→ Unconnected
//!                                │
//!                                └── send() breaks the connection ──→ Unconnected
//! ```
//!
//! A server refusing the sender, a recipient or the message is answered with
//! RSET and the session stays ready. Only a transport failure or a refused
//! RSET drops the connection, after a best-effort QUIT, so the next
//! `connect` dials a fresh one. Errors in the message itself (bad address,
//! missing attachment, too large) are caught before any I/O.

use std::fmt;

use postbox_mime::{AttachmentSource, Email, FsSource};

use crate::config::ServerConfig;
use crate::connection::{
    Client, Connector, Ready, ServerInfo, SmtpConnection, TcpConnector, TransactionError,
};
use crate::error::{Error, Result};
use crate::transaction::{deliver, open, prepare, quit_quietly};
use crate::types::AuthMechanism;

struct Connection<S> {
    client: Client<S, Ready>,
    mechanism: Option<AuthMechanism>,
}

enum SessionState<S> {
    Unconnected,
    Ready(Connection<S>),
}

/// A reusable connection to one SMTP server.
///
/// `send` takes `&mut self`, so a session runs one transaction at a time.
/// Wrap sessions in a [`Mailer`](crate::Mailer) to share them between tasks.
pub struct Session<C: Connector = TcpConnector> {
    config: ServerConfig,
    connector: C,
    source: Box<dyn AttachmentSource>,
    state: SessionState<C::Stream>,
}

impl Session {
    /// Creates an unconnected session that dials over TCP.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> Session<C> {
    /// Creates an unconnected session that dials through `connector`.
    #[must_use]
    pub fn with_connector(config: ServerConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            source: Box::new(FsSource::new()),
            state: SessionState::Unconnected,
        }
    }

    /// Replaces the source attachments are read from (filesystem by default).
    #[must_use]
    pub fn attachment_source(mut self, source: impl AttachmentSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns true if the session holds an open connection.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Returns the capabilities of the connected server.
    #[must_use]
    pub fn server_info(&self) -> Option<&ServerInfo> {
        match &self.state {
            SessionState::Ready(conn) => Some(conn.client.server_info()),
            SessionState::Unconnected => None,
        }
    }

    /// Returns the mechanism used to authenticate, if the session did.
    #[must_use]
    pub const fn auth_mechanism(&self) -> Option<AuthMechanism> {
        match &self.state {
            SessionState::Ready(conn) => conn.mechanism,
            SessionState::Unconnected => None,
        }
    }

    /// Returns true if the connection is TLS-encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        match &self.state {
            SessionState::Ready(conn) => conn.client.is_tls(),
            SessionState::Unconnected => false,
        }
    }

    /// Opens the connection: dial, greeting, EHLO, STARTTLS when offered and
    /// AUTH when offered and credentials are configured.
    ///
    /// Does nothing if the session is already connected.
    ///
    /// # Errors
    ///
    /// Returns the failing step wrapped with its [`Phase`](crate::Phase). The
    /// session stays unconnected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_ready() {
            tracing::debug!(host = %self.config.host, "already connected");
            return Ok(());
        }

        let (client, mechanism) = open(&self.connector, &self.config).await?;
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            tls = client.is_tls(),
            auth = mechanism.map(AuthMechanism::as_str),
            "connected"
        );
        self.state = SessionState::Ready(Connection { client, mechanism });
        Ok(())
    }

    /// Sends one message over the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without any I/O if `connect` has not
    /// succeeded. Validation, assembly and size errors, and replies refusing
    /// the transaction, leave the session ready. A transport error or a
    /// refused RSET drops the connection.
    pub async fn send(&mut self, email: &Email) -> Result<()> {
        let SessionState::Ready(conn) = &mut self.state else {
            return Err(Error::NotConnected);
        };
        let prepared = prepare(email, self.source.as_ref())?;
        prepared.check_limits(conn.client.server_info())?;

        let error = match deliver(&mut conn.client, &prepared).await {
            Ok(()) => return Ok(()),
            Err(TransactionError::Refused(e)) => {
                tracing::warn!(
                    host = %self.config.host,
                    phase = ?e.phase(),
                    code = e.reply_code(),
                    "transaction refused, connection kept"
                );
                return Err(e);
            }
            Err(TransactionError::Broken(e)) => e,
        };

        tracing::warn!(
            host = %self.config.host,
            phase = ?error.phase(),
            error = %error,
            "transaction failed, connection dropped"
        );
        if let SessionState::Ready(conn) =
            std::mem::replace(&mut self.state, SessionState::Unconnected)
        {
            quit_quietly(conn.client).await;
        }
        Err(error)
    }

    /// Closes the connection with a best-effort QUIT.
    ///
    /// Always ends unconnected. A failing QUIT is logged, not returned.
    ///
    /// # Errors
    ///
    /// Currently never fails.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let SessionState::Ready(conn) =
            std::mem::replace(&mut self.state, SessionState::Unconnected)
        {
            quit_quietly(conn.client).await;
            tracing::info!(host = %self.config.host, "disconnected");
        }
        Ok(())
    }
}

impl<C: Connector> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("ready", &self.is_ready())
            .field("auth_mechanism", &self.auth_mechanism())
            .finish_non_exhaustive()
    }
}
