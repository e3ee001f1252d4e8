//! Shared access to SMTP sessions from many tasks.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use postbox_mime::Email;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::connection::{Connector, TcpConnector};
use crate::error::{Error, Result};
use crate::session::Session;

/// A cloneable handle to one or more sessions.
///
/// Every operation holds a session's lock for its whole duration, so no two
/// transactions ever interleave on one connection.
#[derive(Debug)]
pub struct Mailer<C: Connector = TcpConnector> {
    sessions: Arc<[Mutex<Session<C>>]>,
    next: Arc<AtomicUsize>,
}

impl<C: Connector> Clone for Mailer<C> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            next: Arc::clone(&self.next),
        }
    }
}

impl Mailer {
    /// One session; concurrent sends wait for each other.
    #[must_use]
    pub fn single(config: ServerConfig) -> Self {
        Self::from_sessions([Session::new(config)])
    }

    /// `size` independent sessions to the same server.
    #[must_use]
    pub fn pooled(config: &ServerConfig, size: NonZeroUsize) -> Self {
        Self::from_sessions((0..size.get()).map(|_| Session::new(config.clone())))
    }
}

impl<C: Connector> Mailer<C> {
    /// Wraps existing sessions.
    #[must_use]
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session<C>>) -> Self {
        Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if the mailer has no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Connects every session that is not already connected.
    ///
    /// # Errors
    ///
    /// Returns the first connection error.
    pub async fn connect(&self) -> Result<()> {
        for session in self.sessions.iter() {
            session.lock().await.connect().await?;
        }
        Ok(())
    }

    /// Sends a message on a free connected session, or waits for the next
    /// one in turn. Sessions whose connection was dropped are skipped until
    /// [`connect`](Self::connect) reopens them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no session is connected, otherwise
    /// whatever [`Session::send`] returns.
    pub async fn send(&self, email: &Email) -> Result<()> {
        let count = self.sessions.len();
        if count == 0 {
            return Err(Error::NotConnected);
        }

        let start = self.next.fetch_add(1, Ordering::Relaxed) % count;
        let order = (0..count).map(|offset| (start + offset) % count);
        for i in order.clone() {
            if let Ok(mut session) = self.sessions[i].try_lock()
                && session.is_ready()
            {
                return session.send(email).await;
            }
        }

        for i in order {
            let mut session = self.sessions[i].lock().await;
            if session.is_ready() {
                return session.send(email).await;
            }
        }
        tracing::debug!(sessions = count, "no connected session");
        Err(Error::NotConnected)
    }

    /// Disconnects every session.
    ///
    /// # Errors
    ///
    /// Currently never fails; QUIT failures are logged.
    pub async fn disconnect(&self) -> Result<()> {
        for session in self.sessions.iter() {
            session.lock().await.disconnect().await?;
        }
        Ok(())
    }
}
