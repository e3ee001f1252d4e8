//! Integration tests for sessions, the mailer and one-shot sending.
//!
//! A scripted mock server answers each read with the next queued reply and
//! records everything the client writes.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use postbox_smtp::{
    Attachment, AuthMechanism, Connector, Email, Error, ErrorKind, Mailer, Phase, Result,
    ServerConfig, Session, Transport, send_with,
};

const GREETING: &str = "220 mx.test ESMTP ready\r\n";
const EHLO: &str = "250-mx.test\r\n250 8BITMIME\r\n";
const OK: &str = "250 ok\r\n";
const GO_AHEAD: &str = "354 end with <CRLF>.<CRLF>\r\n";
const BYE: &str = "221 bye\r\n";

type Transcript = Arc<Mutex<Vec<u8>>>;

/// Mock stream that returns one scripted reply per read.
struct MockStream {
    replies: VecDeque<Vec<u8>>,
    written: Transcript,
    tls: bool,
}

impl MockStream {
    fn new(replies: &[&str]) -> (Self, Transcript) {
        let written = Transcript::default();
        let stream = Self {
            replies: replies.iter().map(|r| r.as_bytes().to_vec()).collect(),
            written: Arc::clone(&written),
            tls: false,
        };
        (stream, written)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(mut reply) = self.replies.pop_front() {
            let n = reply.len().min(buf.remaining());
            buf.put_slice(&reply[..n]);
            if n < reply.len() {
                let rest = reply.split_off(n);
                self.replies.push_front(rest);
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Transport for MockStream {
    async fn upgrade_to_tls(mut self, _hostname: &str) -> Result<Self> {
        self.tls = true;
        Ok(self)
    }

    fn is_tls(&self) -> bool {
        self.tls
    }
}

/// Hands out scripted streams in order and counts dials.
#[derive(Clone, Default)]
struct MockConnector {
    streams: Arc<Mutex<VecDeque<MockStream>>>,
    dials: Arc<AtomicUsize>,
}

impl MockConnector {
    fn with_server(replies: &[&str]) -> (Self, Transcript) {
        let connector = Self::default();
        let written = connector.add_server(replies);
        (connector, written)
    }

    fn add_server(&self, replies: &[&str]) -> Transcript {
        let (stream, written) = MockStream::new(replies);
        self.streams.lock().unwrap().push_back(stream);
        written
    }

    fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self, _config: &ServerConfig) -> Result<MockStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no server").into())
    }
}

fn config() -> ServerConfig {
    ServerConfig::new("mx.test", 25).client_hostname("client.test")
}

fn no_files(name: &str) -> io::Result<Vec<u8>> {
    Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()))
}

fn session(connector: &MockConnector) -> Session<MockConnector> {
    Session::with_connector(config(), connector.clone()).attachment_source(no_files)
}

fn hello() -> Email {
    Email::builder()
        .from("s@x")
        .to(["a@x"])
        .subject("greeting")
        .body("hello")
        .build()
}

fn transcript(written: &Transcript) -> String {
    String::from_utf8(written.lock().unwrap().clone()).unwrap()
}

/// Payloads sent after each `DATA` command, without the terminator.
fn data_sections(written: &Transcript) -> Vec<String> {
    transcript(written)
        .split("DATA\r\n")
        .skip(1)
        .map(|part| {
            let end = part.find("\r\n.\r\n").unwrap();
            part[..end + 2].to_string()
        })
        .collect()
}

#[tokio::test]
async fn hello_transaction_is_byte_exact() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK, BYE]);
    let mut session = session(&connector);

    session.connect().await.unwrap();
    session.send(&hello()).await.unwrap();
    session.disconnect().await.unwrap();

    let expected = concat!(
        "EHLO client.test\r\n",
        "MAIL FROM:<s@x>\r\n",
        "RCPT TO:<a@x>\r\n",
        "DATA\r\n",
        "From: s@x\r\n",
        "To: a@x\r\n",
        "Subject: greeting\r\n",
        "Content-Type: multipart/mixed; boundary=----PostboxBoundary7MA4YWxkTrZu0gW\r\n",
        "Mime-Version: 1.0\r\n",
        "\r\n",
        "------PostboxBoundary7MA4YWxkTrZu0gW\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "hello\r\n",
        "------PostboxBoundary7MA4YWxkTrZu0gW--\r\n",
        ".\r\n",
        "QUIT\r\n",
    );
    assert_eq!(transcript(&written), expected);
    assert!(!session.is_ready());
}

#[tokio::test]
async fn connect_twice_dials_once() {
    let (connector, written) = MockConnector::with_server(&[GREETING, EHLO]);
    let mut session = session(&connector);

    session.connect().await.unwrap();
    session.connect().await.unwrap();

    assert_eq!(connector.dials(), 1);
    assert_eq!(transcript(&written), "EHLO client.test\r\n");
    assert!(session.is_ready());
}

#[tokio::test]
async fn send_before_connect_is_a_precondition_error() {
    let connector = MockConnector::default();
    let mut session = session(&connector);

    let err = session.send(&hello()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(connector.dials(), 0);
}

#[tokio::test]
async fn disconnect_without_connect_succeeds() {
    let connector = MockConnector::default();
    let mut session = session(&connector);

    session.disconnect().await.unwrap();
    assert_eq!(connector.dials(), 0);
    assert!(!session.is_ready());
}

#[tokio::test]
async fn line_break_in_address_fails_before_any_io() {
    let (connector, written) = MockConnector::with_server(&[GREETING, EHLO]);
    let mut session = session(&connector);
    session.connect().await.unwrap();
    let before = transcript(&written);

    let email = Email::builder()
        .from("s@x")
        .to(["a@x>\r\nRCPT TO:<evil@x"])
        .body("hello")
        .build();
    let err = session.send(&email).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    assert_eq!(err.phase(), Some(Phase::Validate));
    assert_eq!(transcript(&written), before);
    assert!(session.is_ready());
}

#[tokio::test]
async fn bcc_is_envelope_only() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, EHLO, OK, OK, OK, OK, GO_AHEAD, OK]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let email = Email::builder()
        .from("s@x")
        .to(["a@x"])
        .cc(["b@x"])
        .bcc(["c@x"])
        .body("hi")
        .build();
    session.send(&email).await.unwrap();

    let sent = transcript(&written);
    let rcpt_a = sent.find("RCPT TO:<a@x>").unwrap();
    let rcpt_b = sent.find("RCPT TO:<b@x>").unwrap();
    let rcpt_c = sent.find("RCPT TO:<c@x>").unwrap();
    assert!(rcpt_a < rcpt_b && rcpt_b < rcpt_c);

    let payload = &data_sections(&written)[0];
    assert!(payload.contains("CC: b@x\r\n"));
    assert!(!payload.contains("c@x"));
}

#[tokio::test]
async fn sequential_sends_are_independent() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING, EHLO, OK, OK, GO_AHEAD, OK, OK, OK, GO_AHEAD, OK,
    ]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let first = Email::builder().from("s@x").to(["a@x"]).body("first").build();
    let second = Email::builder().from("s@x").to(["b@x"]).body("second").build();
    session.send(&first).await.unwrap();
    session.send(&second).await.unwrap();

    let sections = data_sections(&written);
    assert_eq!(sections.len(), 2);
    assert!(sections[0].contains("first") && !sections[0].contains("second"));
    assert!(sections[1].contains("second") && !sections[1].contains("first"));
    assert!(sections[1].contains("To: b@x\r\n"));
    assert_eq!(connector.dials(), 1);
}

#[tokio::test]
async fn rejected_recipient_is_named_and_session_stays_ready() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        EHLO,
        OK,
        OK,
        "550 5.1.1 no such user\r\n",
        OK,
        OK,
        OK,
        GO_AHEAD,
        OK,
    ]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let email = Email::builder()
        .from("s@x")
        .to(["a@x", "ghost@x"])
        .body("hi")
        .build();
    let err = session.send(&email).await.unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Rcpt));
    assert_eq!(err.rejected_recipient(), Some("ghost@x"));
    assert_eq!(err.reply_code(), Some(550));
    assert!(err.is_permanent());
    assert!(transcript(&written).ends_with("RCPT TO:<ghost@x>\r\nRSET\r\n"));
    assert!(session.is_ready());

    session.send(&hello()).await.unwrap();
    assert_eq!(data_sections(&written).len(), 1);
    assert_eq!(connector.dials(), 1);
}

#[tokio::test]
async fn refused_sender_and_message_keep_the_connection() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        EHLO,
        "451 try later\r\n",
        OK,
        OK,
        OK,
        GO_AHEAD,
        "554 5.7.1 spam\r\n",
        OK,
        OK,
        GO_AHEAD,
        OK,
    ]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let err = session.send(&hello()).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Mail));
    assert!(err.is_transient());
    assert!(session.is_ready());

    let err = session.send(&hello()).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Data));
    assert_eq!(err.reply_code(), Some(554));
    assert!(session.is_ready());

    session.send(&hello()).await.unwrap();
    let text = transcript(&written);
    // Only the refused MAIL needed a reset
    assert_eq!(text.matches("RSET\r\n").count(), 1);
    assert_eq!(text.matches("MAIL FROM").count(), 3);
    assert_eq!(data_sections(&written).len(), 2);
    assert_eq!(connector.dials(), 1);
}

#[tokio::test]
async fn refused_rset_drops_connection_with_quit() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        EHLO,
        "550 sender blocked\r\n",
        "421 closing\r\n",
    ]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let err = session.send(&hello()).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Mail));
    assert_eq!(err.reply_code(), Some(550));
    assert!(!session.is_ready());
    assert!(transcript(&written).ends_with("RSET\r\nQUIT\r\n"));

    let err = session.send(&hello()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
}

#[tokio::test]
async fn reconnect_after_broken_transaction_dials_again() {
    // The first server hangs up instead of answering MAIL
    let (connector, first) = MockConnector::with_server(&[GREETING, EHLO]);
    let second = connector.add_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK]);
    let mut session = session(&connector);

    session.connect().await.unwrap();
    let err = session.send(&hello()).await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Mail));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!session.is_ready());
    assert!(transcript(&first).ends_with("QUIT\r\n"));

    session.connect().await.unwrap();
    session.send(&hello()).await.unwrap();
    assert_eq!(connector.dials(), 2);
    assert_eq!(data_sections(&second).len(), 1);
}

#[tokio::test]
async fn quit_failure_is_swallowed() {
    let (connector, written) = MockConnector::with_server(&[GREETING, EHLO, "500 what\r\n"]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    session.disconnect().await.unwrap();
    assert!(transcript(&written).ends_with("QUIT\r\n"));
    assert!(!session.is_ready());
}

#[tokio::test]
async fn quit_on_closed_connection_is_swallowed() {
    let (connector, _) = MockConnector::with_server(&[GREETING, EHLO]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    session.disconnect().await.unwrap();
    assert!(!session.is_ready());
}

#[tokio::test]
async fn missing_attachment_aborts_before_mail() {
    let (connector, written) = MockConnector::with_server(&[GREETING, EHLO]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let email = Email::builder()
        .from("s@x")
        .to(["a@x"])
        .body("see attached")
        .attachment(Attachment::file("missing.pdf", "application/pdf"))
        .build();
    let err = session.send(&email).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AttachmentRead);
    assert_eq!(err.phase(), Some(Phase::Assemble));
    assert!(!transcript(&written).contains("MAIL FROM"));
    assert!(session.is_ready());
}

#[tokio::test]
async fn attachment_is_read_from_the_configured_source() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK]);
    let mut session = Session::with_connector(config(), connector.clone())
        .attachment_source(|_: &str| -> io::Result<Vec<u8>> { Ok(b"%PDF-1.4".to_vec()) });
    session.connect().await.unwrap();

    let email = Email::builder()
        .from("s@x")
        .to(["a@x"])
        .body("see attached")
        .attachment(Attachment::file("report.pdf", "application/pdf"))
        .build();
    session.send(&email).await.unwrap();

    let payload = &data_sections(&written)[0];
    assert!(payload.contains("Content-Type: application/pdf; name=\"report.pdf\"\r\n"));
    assert!(payload.contains("JVBERi0xLjQ=\r\n"));
}

#[tokio::test]
async fn oversized_message_is_rejected_locally() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, "250-mx.test\r\n250 SIZE 64\r\n"]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let err = session.send(&hello()).await.unwrap_err();
    assert!(matches!(err.root(), Error::MessageTooLarge { limit: 64, .. }));
    assert!(!transcript(&written).contains("MAIL FROM"));
    assert!(session.is_ready());
}

#[tokio::test]
async fn size_and_8bitmime_are_declared() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        "250-mx.test\r\n250-SIZE 100000\r\n250 8BITMIME\r\n",
        OK,
        OK,
        GO_AHEAD,
        OK,
    ]);
    let mut session = session(&connector);
    session.connect().await.unwrap();

    let email = Email::builder().from("s@x").to(["a@x"]).body("grüße").build();
    session.send(&email).await.unwrap();

    let size = data_sections(&written)[0].len();
    assert!(transcript(&written).contains(&format!("MAIL FROM:<s@x> BODY=8BITMIME SIZE={size}\r\n")));
}

#[tokio::test]
async fn starttls_is_used_when_advertised() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        "250-mx.test\r\n250-STARTTLS\r\n250 AUTH LOGIN PLAIN\r\n",
        "220 ready to start TLS\r\n",
        "250-mx.test\r\n250 AUTH LOGIN PLAIN\r\n",
        "235 authenticated\r\n",
    ]);
    let mut session = Session::with_connector(
        config().credentials("user", "pass"),
        connector.clone(),
    );

    session.connect().await.unwrap();

    assert!(session.is_tls());
    assert_eq!(session.auth_mechanism(), Some(AuthMechanism::Plain));
    assert_eq!(
        transcript(&written),
        concat!(
            "EHLO client.test\r\n",
            "STARTTLS\r\n",
            "EHLO client.test\r\n",
            "AUTH PLAIN AHVzZXIAcGFzcw==\r\n",
        )
    );
}

#[tokio::test]
async fn starttls_failure_is_fatal() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        "250-mx.test\r\n250 STARTTLS\r\n",
        "454 TLS not available\r\n",
    ]);
    let mut session = session(&connector);

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Tls));
    assert!(!session.is_ready());
    assert!(!transcript(&written).contains("MAIL"));
}

#[tokio::test]
async fn credentials_are_refused_over_plaintext() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, "250-mx.test\r\n250 AUTH PLAIN\r\n"]);
    let mut session = Session::with_connector(
        config().credentials("user", "pass"),
        connector.clone(),
    );

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Auth));
    assert!(matches!(err.root(), Error::InsecureAuth(_)));
    assert!(!transcript(&written).contains("AUTH"));
    assert!(!session.is_ready());
}

#[tokio::test]
async fn loopback_allows_plaintext_login() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING,
        "250-localhost\r\n250 AUTH LOGIN\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 ok\r\n",
    ]);
    let config = ServerConfig::new("localhost", 2525)
        .client_hostname("client.test")
        .credentials("user", "pass");
    let mut session = Session::with_connector(config, connector.clone());

    session.connect().await.unwrap();
    assert_eq!(session.auth_mechanism(), Some(AuthMechanism::Login));
    assert!(transcript(&written).ends_with("AUTH LOGIN\r\ndXNlcg==\r\ncGFzcw==\r\n"));
}

#[tokio::test]
async fn auth_is_skipped_without_username() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, "250-mx.test\r\n250 AUTH PLAIN\r\n"]);
    let mut session = session(&connector);

    session.connect().await.unwrap();
    assert_eq!(session.auth_mechanism(), None);
    assert!(!transcript(&written).contains("AUTH"));
}

#[tokio::test]
async fn rejected_credentials_leave_session_unconnected() {
    let (connector, _) = MockConnector::with_server(&[
        GREETING,
        "250-mx.test\r\n250-STARTTLS\r\n250 AUTH PLAIN\r\n",
        "220 go ahead\r\n",
        "250-mx.test\r\n250 AUTH PLAIN\r\n",
        "535 5.7.8 authentication failed\r\n",
    ]);
    let mut session = Session::with_connector(
        config().credentials("user", "wrong"),
        connector.clone(),
    );

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Auth));
    assert_eq!(err.reply_code(), Some(535));
    assert!(!session.is_ready());
}

#[tokio::test]
async fn greeting_and_dial_failures_are_phased() {
    let (connector, _) = MockConnector::with_server(&["554 no service\r\n"]);
    let mut session = session(&connector);

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Greeting));

    let err = session.connect().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Dial));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(connector.dials(), 2);
}

#[tokio::test]
async fn ehlo_rejection_falls_back_to_helo() {
    let (connector, written) =
        MockConnector::with_server(&[GREETING, "500 unrecognized\r\n", "250 mx.test\r\n"]);
    let mut session = session(&connector);

    session.connect().await.unwrap();
    assert_eq!(
        transcript(&written),
        "EHLO client.test\r\nHELO client.test\r\n"
    );
}

#[tokio::test]
async fn one_shot_and_session_send_identical_payloads() {
    let email = Email::builder()
        .from("s@x")
        .to(["a@x"])
        .cc(["b@x"])
        .subject("same")
        .body(".leading dot\nsecond line")
        .build();

    let (one_shot, one_shot_written) =
        MockConnector::with_server(&[GREETING, EHLO, OK, OK, OK, GO_AHEAD, OK, BYE]);
    send_with(&one_shot, &config(), &email, &no_files)
        .await
        .unwrap();

    let (connector, session_written) =
        MockConnector::with_server(&[GREETING, EHLO, OK, OK, OK, GO_AHEAD, OK, BYE]);
    let mut session = session(&connector);
    session.connect().await.unwrap();
    session.send(&email).await.unwrap();
    session.disconnect().await.unwrap();

    assert_eq!(transcript(&one_shot_written), transcript(&session_written));
    assert!(data_sections(&one_shot_written)[0].contains("\r\n..leading dot\r\n"));
}

#[tokio::test]
async fn one_shot_validates_before_dialing() {
    let connector = MockConnector::default();
    let email = Email::builder().from("").to(["a@x"]).build();

    let err = send_with(&connector, &config(), &email, &no_files)
        .await
        .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Validate));
    assert_eq!(connector.dials(), 0);
}

#[tokio::test]
async fn pooled_mailer_spreads_concurrent_sends() {
    let connector = MockConnector::default();
    let first = connector.add_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK, BYE]);
    let second = connector.add_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK, BYE]);
    let mailer = Mailer::from_sessions([session(&connector), session(&connector)]);
    assert_eq!(mailer.len(), 2);

    mailer.connect().await.unwrap();
    let other = mailer.clone();
    let a = Email::builder().from("s@x").to(["a@x"]).body("one").build();
    let b = Email::builder().from("s@x").to(["b@x"]).body("two").build();
    let (ra, rb) = tokio::join!(mailer.send(&a), other.send(&b));
    ra.unwrap();
    rb.unwrap();
    mailer.disconnect().await.unwrap();

    assert_eq!(connector.dials(), 2);
    assert_eq!(data_sections(&first).len(), 1);
    assert_eq!(data_sections(&second).len(), 1);
}

#[tokio::test]
async fn pooled_mailer_skips_dropped_session() {
    let connector = MockConnector::default();
    // Hangs up on the first transaction
    let first = connector.add_server(&[GREETING, EHLO]);
    let second = connector.add_server(&[
        GREETING, EHLO, OK, OK, GO_AHEAD, OK, OK, OK, GO_AHEAD, OK, OK, OK, GO_AHEAD, OK,
    ]);
    let mailer = Mailer::from_sessions([session(&connector), session(&connector)]);
    mailer.connect().await.unwrap();

    let err = mailer.send(&hello()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(transcript(&first).ends_with("QUIT\r\n"));

    for _ in 0..3 {
        mailer.send(&hello()).await.unwrap();
    }
    assert_eq!(data_sections(&second).len(), 3);
    assert!(data_sections(&first).is_empty());

    // connect() reopens only the dropped slot
    let third = connector.add_server(&[GREETING, EHLO, OK, OK, GO_AHEAD, OK]);
    mailer.connect().await.unwrap();
    assert_eq!(connector.dials(), 3);
    mailer.send(&hello()).await.unwrap();
    assert_eq!(data_sections(&third).len() + data_sections(&second).len(), 4);
}

#[tokio::test]
async fn mailer_with_no_connected_session_is_a_precondition_error() {
    let (connector, _) = MockConnector::with_server(&[GREETING, EHLO]);
    let mailer = Mailer::from_sessions([session(&connector), session(&connector)]);
    // Only the first slot gets a server
    assert!(mailer.connect().await.is_err());

    let err = mailer.send(&hello()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    let err = mailer.send(&hello()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));
}

#[tokio::test]
async fn single_mailer_serializes_sends() {
    let (connector, written) = MockConnector::with_server(&[
        GREETING, EHLO, OK, OK, GO_AHEAD, OK, OK, OK, GO_AHEAD, OK,
    ]);
    let mailer = Mailer::from_sessions([session(&connector)]);
    mailer.connect().await.unwrap();

    let a = Email::builder().from("s@x").to(["a@x"]).body("one").build();
    let b = Email::builder().from("s@x").to(["b@x"]).body("two").build();
    let (ra, rb) = tokio::join!(mailer.send(&a), mailer.send(&b));
    ra.unwrap();
    rb.unwrap();

    let sections = data_sections(&written);
    assert_eq!(sections.len(), 2);
    assert_eq!(transcript(&written).matches("MAIL FROM").count(), 2);
}

#[tokio::test]
async fn mailer_before_connect_is_a_precondition_error() {
    let mailer = Mailer::single(config());
    let err = mailer.send(&hello()).await.unwrap_err();
    assert!(matches!(err, Error::NotConnected));

    let pooled = Mailer::pooled(&config(), NonZeroUsize::new(3).unwrap());
    assert_eq!(pooled.len(), 3);
    assert!(!pooled.is_empty());
}
