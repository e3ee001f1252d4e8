//! One-shot sending: connect, send one message, disconnect.

use postbox_mime::{AttachmentSource, Email, FsSource};

use crate::config::ServerConfig;
use crate::connection::{Connector, SmtpConnection, TcpConnector, TransactionError};
use crate::error::Result;
use crate::transaction::{deliver, open, prepare, quit_quietly};

/// Sends one message over a fresh connection, reading attachments from the
/// filesystem.
///
/// The message is validated and assembled before the server is dialed.
///
/// # Errors
///
/// Returns the first failing step wrapped with its [`Phase`](crate::Phase).
/// QUIT is sent whether or not the transaction succeeded; its failure is
/// logged, not returned.
pub async fn send(config: &ServerConfig, email: &Email) -> Result<()> {
    send_with(&TcpConnector, config, email, &FsSource::new()).await
}

/// Like [`send`], with a custom connector and attachment source.
///
/// # Errors
///
/// See [`send`].
pub async fn send_with<C, A>(
    connector: &C,
    config: &ServerConfig,
    email: &Email,
    source: &A,
) -> Result<()>
where
    C: Connector,
    A: AttachmentSource + ?Sized,
{
    let prepared = prepare(email, source)?;

    let (mut client, _) = open(connector, config).await?;
    let mut result = prepared.check_limits(client.server_info());
    if result.is_ok() {
        result = deliver(&mut client, &prepared)
            .await
            .map_err(TransactionError::into_error);
    }
    quit_quietly(client).await;
    result?;

    tracing::info!(host = %config.host, port = config.port, "message sent");
    Ok(())
}
