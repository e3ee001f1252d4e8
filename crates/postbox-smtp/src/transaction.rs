//! Handshake and mail transaction steps shared by [`Session`](crate::Session)
//! and the one-shot [`send`](crate::send()).

use std::net::IpAddr;

use postbox_mime::{AttachmentSource, Email};

use crate::config::ServerConfig;
use crate::command::MailParams;
use crate::connection::{
    Client, Connector, Ready, ServerInfo, SmtpConnection, TransactionError, Transport,
};
use crate::error::{Error, Phase, Result};
use crate::types::{Address, AuthMechanism};

/// A validated message with its envelope and assembled payload.
#[derive(Debug)]
pub(crate) struct Prepared {
    from: Address,
    recipients: Vec<Address>,
    payload: Vec<u8>,
}

impl Prepared {
    /// Rejects payloads above the server's advertised SIZE limit.
    pub(crate) fn check_limits(&self, info: &ServerInfo) -> Result<()> {
        match info.max_message_size() {
            Some(limit) if self.payload.len() > limit => Err(Error::MessageTooLarge {
                size: self.payload.len(),
                limit,
            }
            .in_phase(Phase::Mail)),
            _ => Ok(()),
        }
    }

    fn mail_params(&self, info: &ServerInfo) -> MailParams {
        MailParams {
            size: info.supports_size().then_some(self.payload.len()),
            eight_bit_mime: info.supports_8bitmime() && !self.payload.is_ascii(),
        }
    }
}

/// Validates the message and assembles its payload. Performs no network I/O.
pub(crate) fn prepare<A>(email: &Email, source: &A) -> Result<Prepared>
where
    A: AttachmentSource + ?Sized,
{
    postbox_mime::validate_email(email).map_err(|e| Error::from(e).in_phase(Phase::Validate))?;

    let from = Address::new(email.from()).map_err(|e| e.in_phase(Phase::Validate))?;
    let recipients = email
        .recipients()
        .map(Address::new)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| e.in_phase(Phase::Validate))?;
    if recipients.is_empty() {
        return Err(Error::NoRecipients.in_phase(Phase::Validate));
    }

    let payload =
        postbox_mime::assemble(email, source).map_err(|e| Error::from(e).in_phase(Phase::Assemble))?;

    Ok(Prepared {
        from,
        recipients,
        payload,
    })
}

/// Dials the server and runs greeting, EHLO, STARTTLS and AUTH.
///
/// Returns the ready client and the mechanism used, if any.
pub(crate) async fn open<C: Connector>(
    connector: &C,
    config: &ServerConfig,
) -> Result<(Client<C::Stream, Ready>, Option<AuthMechanism>)> {
    tracing::debug!(host = %config.host, port = config.port, "dialing");
    let stream = connector
        .connect(config)
        .await
        .map_err(|e| e.in_phase(Phase::Dial))?;

    let client = Client::from_stream(stream)
        .await
        .map_err(|e| e.in_phase(Phase::Greeting))?;
    let mut client = client
        .hello(&config.client_hostname)
        .await
        .map_err(|e| e.in_phase(Phase::Ehlo))?;

    if !client.is_tls() && client.server_info().supports_starttls() {
        client = client
            .starttls(&config.host, &config.client_hostname)
            .await
            .map_err(|e| e.in_phase(Phase::Tls))?;
    }

    if !config.has_credentials() || !client.server_info().supports_auth() {
        return Ok((client.skip_auth(), None));
    }
    if !client.is_tls() && !is_loopback(&config.host) {
        return Err(Error::InsecureAuth(config.host.clone()).in_phase(Phase::Auth));
    }

    let mechanism = AuthMechanism::select(&client.server_info().auth_mechanisms());
    let client = client
        .authenticate(mechanism, &config.username, &config.password)
        .await
        .map_err(|e| e.in_phase(Phase::Auth))?;
    Ok((client, Some(mechanism)))
}

/// Runs one MAIL/RCPT/DATA transaction. The client stays ready unless the
/// error is [`TransactionError::Broken`].
pub(crate) async fn deliver<S: Transport>(
    client: &mut Client<S, Ready>,
    prepared: &Prepared,
) -> std::result::Result<(), TransactionError> {
    let params = prepared.mail_params(client.server_info());
    client
        .send_mail(&prepared.from, &prepared.recipients, params, &prepared.payload)
        .await?;

    tracing::debug!(
        recipients = prepared.recipients.len(),
        bytes = prepared.payload.len(),
        "message accepted"
    );
    Ok(())
}

/// Sends QUIT, logging instead of returning a failure.
pub(crate) async fn quit_quietly<S: Transport, State>(client: Client<S, State>) {
    if let Err(e) = client.quit().await {
        tracing::warn!(error = %e, "QUIT failed, connection closed anyway");
    }
}

/// Returns true for hosts that never leave the machine.
pub(crate) fn is_loopback(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
