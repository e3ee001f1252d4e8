#![allow(clippy::doc_markdown)]
//! Example: send a small batch through a pooled mailer
//!
//! Reads the server and credentials from the environment, sends one message
//! with the one-shot API and then a batch of messages concurrently through a
//! pool of sessions.
//!
//! ## Running
//!
//! ```bash
//! SMTP_HOST=smtp.example.com SMTP_PORT=587 \
//! SMTP_USER=me@example.com SMTP_PASSWORD=app-password \
//! MAIL_TO=friend@example.org RUST_LOG=postbox_smtp=debug \
//! cargo run --package postbox-smtp --example send_batch
//! ```

use std::env;
use std::num::NonZeroUsize;

use anyhow::Context;
use postbox_smtp::{Email, Mailer, Security, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postbox_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("SMTP_HOST").context("SMTP_HOST is not set")?;
    let port: u16 = env::var("SMTP_PORT")
        .unwrap_or_else(|_| "587".into())
        .parse()
        .context("SMTP_PORT is not a port number")?;
    let user = env::var("SMTP_USER").unwrap_or_default();
    let password = env::var("SMTP_PASSWORD").unwrap_or_default();
    let to = env::var("MAIL_TO").context("MAIL_TO is not set")?;
    let from = if user.is_empty() { to.clone() } else { user.clone() };

    let security = if port == 465 {
        Security::Implicit
    } else {
        Security::Opportunistic
    };
    let config = ServerConfig::new(host, port)
        .credentials(user, password)
        .security(security);

    let single = Email::builder()
        .from(&from)
        .to([&to])
        .subject("postbox one-shot")
        .body("Sent with postbox_smtp::send.")
        .build();
    postbox_smtp::send(&config, &single).await?;
    println!("✓ One-shot message sent");

    let mailer = Mailer::pooled(&config, NonZeroUsize::new(2).context("pool size")?);
    mailer.connect().await?;
    println!("✓ Pool connected ({} sessions)", mailer.len());

    let mut tasks = Vec::new();
    for n in 1..=4 {
        let mailer = mailer.clone();
        let email = Email::builder()
            .from(&from)
            .to([&to])
            .subject(format!("postbox batch {n}/4"))
            .body(format!("Message {n} of a pooled batch."))
            .build();
        tasks.push(tokio::spawn(async move { mailer.send(&email).await }));
    }
    for (n, task) in tasks.into_iter().enumerate() {
        match task.await? {
            Ok(()) => println!("✓ Batch message {} sent", n + 1),
            Err(e) => println!("✗ Batch message {} failed ({:?}): {e}", n + 1, e.kind()),
        }
    }

    mailer.disconnect().await?;
    println!("✓ Disconnected");
    Ok(())
}
