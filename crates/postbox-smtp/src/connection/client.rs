//! Type-state SMTP client.

use super::{ServerInfo, Transport};
use crate::command::{Command, MailParams, encode_data};
use crate::error::{Error, Phase, Result};
use crate::parser::ReplyAccumulator;
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// Maximum length of one reply line, CRLF included.
const MAX_LINE_LENGTH: usize = 4096;

/// Type-state marker for a greeted connection that has not authenticated yet.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for a connection ready to start a mail transaction.
#[derive(Debug)]
pub struct Ready;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<S, State> {
    reader: BufReader<S>,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Why [`Client::send_mail`] failed, and whether the connection survived.
#[derive(Debug)]
pub enum TransactionError {
    /// The server refused the transaction. The connection was reset and can
    /// carry the next message.
    Refused(Error),
    /// The connection failed or the server refused RSET. The client must be
    /// dropped.
    Broken(Error),
}

impl TransactionError {
    /// Returns the underlying error.
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            Self::Refused(e) | Self::Broken(e) => e,
        }
    }
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Returns true if the connection is TLS-encrypted.
    fn is_tls(&self) -> bool;
}

impl<S: Transport, State> SmtpConnection for Client<S, State> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn is_tls(&self) -> bool {
        self.reader.get_ref().is_tls()
    }
}

impl<S: Transport> Client<S, Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server does not
    /// answer `220`.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut client = Self {
            reader: BufReader::new(stream),
            server_info: ServerInfo::default(),
            _state: PhantomData,
        };

        let greeting = client.read_reply().await?.expect_code(ReplyCode::SERVICE_READY)?;

        // First word of the greeting is the server's name
        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(client)
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(&Command::Ehlo(client_hostname.to_string()))
            .await?
            .expect_success()?;
        self.record_extensions(&reply);
        Ok(self)
    }

    /// Sends HELO. No extensions are available afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the HELO command fails.
    pub async fn helo(mut self, client_hostname: &str) -> Result<Self> {
        self.send_command(&Command::Helo(client_hostname.to_string()))
            .await?
            .expect_success()?;
        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Sends EHLO, falling back to HELO if the server rejects EHLO with a
    /// permanent error.
    ///
    /// # Errors
    ///
    /// Returns an error if neither greeting is accepted.
    pub async fn hello(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(&Command::Ehlo(client_hostname.to_string()))
            .await?;

        if reply.is_success() {
            self.record_extensions(&reply);
            return Ok(self);
        }
        if reply.code.is_permanent() {
            debug!(code = reply.code.as_u16(), "EHLO rejected, falling back to HELO");
            return self.helo(client_hostname).await;
        }
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }

    /// Upgrades the connection to TLS using STARTTLS and repeats EHLO.
    ///
    /// `server_host` is the name the certificate is checked against.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported, if the server sent data
    /// after its `220` reply, or if the handshake fails.
    pub async fn starttls(mut self, server_host: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(&Command::StartTls)
            .await?
            .expect_code(ReplyCode::SERVICE_READY)?;

        // Anything already buffered was sent in plaintext and must not be
        // read as if it came over TLS.
        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent data before TLS negotiation".into(),
            ));
        }

        let stream = self.reader.into_inner().upgrade_to_tls(server_host).await?;
        debug!(host = server_host, "TLS established");

        let client = Self {
            reader: BufReader::new(stream),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                extensions: Default::default(),
            },
            _state: PhantomData,
        };
        client.ehlo(client_hostname).await
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<S, Ready>> {
        // \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth(
            AuthMechanism::Plain,
            Some(STANDARD.encode(credentials.as_bytes())),
        );

        self.send_command(&cmd)
            .await?
            .expect_code(ReplyCode::AUTH_SUCCESS)?;
        debug!(mechanism = "PLAIN", "authenticated");
        Ok(self.transition())
    }

    /// Authenticates using LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not prompt with `334` or rejects
    /// the credentials.
    pub async fn auth_login(mut self, username: &str, password: &str) -> Result<Client<S, Ready>> {
        self.send_command(&Command::Auth(AuthMechanism::Login, None))
            .await?
            .expect_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(&Command::AuthResponse(STANDARD.encode(username)))
            .await?
            .expect_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(&Command::AuthResponse(STANDARD.encode(password)))
            .await?
            .expect_code(ReplyCode::AUTH_SUCCESS)?;
        debug!(mechanism = "LOGIN", "authenticated");
        Ok(self.transition())
    }

    /// Authenticates with the given mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn authenticate(
        self,
        mechanism: AuthMechanism,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Ready>> {
        match mechanism {
            AuthMechanism::Plain => self.auth_plain(username, password).await,
            AuthMechanism::Login => self.auth_login(username, password).await,
        }
    }

    /// Proceeds without authentication.
    #[must_use]
    pub fn skip_auth(self) -> Client<S, Ready> {
        self.transition()
    }

    fn record_extensions(&mut self, reply: &Reply) {
        // First line of the EHLO reply is the greeting, the rest are keywords
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        debug!(extensions = ?self.server_info.extensions, "server capabilities");
    }
}

impl<S: Transport> Client<S, Ready> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        mut self,
        from: Address,
        params: MailParams,
    ) -> Result<Client<S, MailTransaction>> {
        self.send_command(&Command::MailFrom(from, params))
            .await?
            .expect_success()?;
        Ok(self.transition())
    }

    /// Runs a whole transaction: MAIL FROM, RCPT TO for each recipient, DATA
    /// and the message. Errors carry the [`Phase`] that failed and, for RCPT,
    /// the refused address.
    ///
    /// A refused MAIL, RCPT or DATA is followed by RSET, so the client stays
    /// ready for the next transaction unless the connection itself failed.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Refused`] if the server rejected the
    /// message and the connection is still usable, otherwise
    /// [`TransactionError::Broken`].
    pub async fn send_mail(
        &mut self,
        from: &Address,
        recipients: &[Address],
        params: MailParams,
        message: &[u8],
    ) -> std::result::Result<(), TransactionError> {
        if recipients.is_empty() {
            return Err(TransactionError::Refused(
                Error::NoRecipients.in_phase(Phase::Rcpt),
            ));
        }

        let reply = self
            .send_command(&Command::MailFrom(from.clone(), params))
            .await
            .map_err(broken(Phase::Mail))?;
        if let Err(e) = reply.expect_success() {
            return Err(self.abort(e.in_phase(Phase::Mail)).await);
        }

        for rcpt in recipients {
            let reply = self
                .send_command(&Command::RcptTo(rcpt.clone()))
                .await
                .map_err(|e| TransactionError::Broken(rejected(rcpt, e)))?;
            if let Err(e) = reply.expect_success() {
                return Err(self.abort(rejected(rcpt, e)).await);
            }
        }

        let reply = self
            .send_command(&Command::Data)
            .await
            .map_err(broken(Phase::Data))?;
        if let Err(e) = reply.expect_code(ReplyCode::START_DATA) {
            return Err(self.abort(e.in_phase(Phase::Data)).await);
        }

        // The server has closed the transaction either way
        self.write_message(message)
            .await
            .map_err(broken(Phase::Data))?
            .expect_success()
            .map_err(|e| TransactionError::Refused(e.in_phase(Phase::Data)))?;
        Ok(())
    }

    async fn abort(&mut self, error: Error) -> TransactionError {
        match self
            .send_command(&Command::Rset)
            .await
            .and_then(Reply::expect_success)
        {
            Ok(_) => {
                debug!(error = %error, "transaction refused, reset");
                TransactionError::Refused(error)
            }
            Err(e) => {
                debug!(error = %e, "RSET failed");
                TransactionError::Broken(error)
            }
        }
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer with success.
    pub async fn noop(mut self) -> Result<Self> {
        self.send_command(&Command::Noop).await?.expect_success()?;
        Ok(self)
    }
}

impl<S: Transport> Client<S, MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<S, RecipientAdded>> {
        self.send_command(&Command::RcptTo(to))
            .await?
            .expect_success()?;
        Ok(self.transition())
    }

    /// Resets the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<S, Ready>> {
        self.send_command(&Command::Rset).await?.expect_success()?;
        Ok(self.transition())
    }
}

impl<S: Transport> Client<S, RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.send_command(&Command::RcptTo(to))
            .await?
            .expect_success()?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer `354`.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        self.send_command(&Command::Data)
            .await?
            .expect_code(ReplyCode::START_DATA)?;
        Ok(self.transition())
    }

    /// Resets the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<S, Ready>> {
        self.send_command(&Command::Rset).await?.expect_success()?;
        Ok(self.transition())
    }
}

impl<S: Transport> Client<S, Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, leading dots are stuffed and the
    /// terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Ready>> {
        self.write_message(message).await?.expect_success()?;
        Ok(self.transition())
    }
}

fn broken(phase: Phase) -> impl FnOnce(Error) -> TransactionError {
    move |e| TransactionError::Broken(e.in_phase(phase))
}

fn rejected(rcpt: &Address, source: Error) -> Error {
    Error::Recipient {
        address: rcpt.to_string(),
        source: Box::new(source),
    }
    .in_phase(Phase::Rcpt)
}

// Common implementation for all states
impl<S: Transport, State> Client<S, State> {
    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            reader: self.reader,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        trace!("C: {}", cmd.redacted());
        self.write_all(&cmd.serialize()).await?;
        self.read_reply().await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn write_message(&mut self, message: &[u8]) -> Result<Reply> {
        let encoded = encode_data(message);
        trace!(bytes = encoded.len(), "C: <message data>");
        self.write_all(&encoded).await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut acc = ReplyAccumulator::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = (&mut self.reader)
                .take(MAX_LINE_LENGTH as u64 + 1)
                .read_until(b'\n', &mut line)
                .await?;
            if read == 0 {
                return Err(Error::ConnectionClosed);
            }
            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol(format!(
                    "Reply line exceeds {MAX_LINE_LENGTH} bytes"
                )));
            }

            let text = std::str::from_utf8(&line)
                .map_err(|_| Error::Protocol("Reply is not valid UTF-8".into()))?
                .trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            trace!("S: {text}");

            if let Some(reply) = acc.push(text)? {
                return Ok(reply);
            }
        }
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// The stream is shut down even if the server's reply is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT exchange fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await;
        // Best effort; the connection is finished either way
        let _ = self.reader.get_mut().shutdown().await;
        reply?.expect_success()?;
        Ok(())
    }
}
