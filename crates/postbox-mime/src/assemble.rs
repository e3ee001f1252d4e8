//! `multipart/mixed` message assembly.
//!
//! Produces the exact bytes handed to the SMTP `DATA` phase:
//!
//! ```text
//! From: sender@example.com
//! To: a@example.com, b@example.com
//! CC: c@example.com
//! Subject: Report
//! Content-Type: multipart/mixed; boundary=----PostboxBoundary7MA4YWxkTrZu0gW
//! Mime-Version: 1.0
//!
//! ------PostboxBoundary7MA4YWxkTrZu0gW
//! Content-Type: text/plain; charset=utf-8
//!
//! body text
//! ------PostboxBoundary7MA4YWxkTrZu0gW
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment
//! Content-Type: application/pdf; name="report.pdf"
//!
//! <base64, 76 characters per line>
//! ------PostboxBoundary7MA4YWxkTrZu0gW--
//! ```
//!
//! Every line ends with CRLF. Bcc recipients never appear in the headers.

use crate::address::{validate_email, validate_header};
use crate::content_type::ContentType;
use crate::email::Email;
use crate::encoding::write_folded_base64;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::source::AttachmentSource;

/// Boundary token used unless the body already contains it.
pub const DEFAULT_BOUNDARY: &str = "----PostboxBoundary7MA4YWxkTrZu0gW";

/// Picks a boundary whose delimiter does not occur in the body.
///
/// Starts from [`DEFAULT_BOUNDARY`] and appends `_1`, `_2`, ... on collision.
/// Base64 output never contains `-`, so only the text part needs checking.
#[must_use]
pub fn boundary_for(body: &str) -> String {
    let mut boundary = DEFAULT_BOUNDARY.to_string();
    let mut suffix = 0_u32;
    while body.contains(&format!("--{boundary}")) {
        suffix += 1;
        boundary = format!("{DEFAULT_BOUNDARY}_{suffix}");
    }
    boundary
}

/// Assembles a message into its wire payload.
///
/// Assembly is all-or-nothing: validation and the attachment read happen
/// before any byte is produced.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] or [`Error::InvalidHeader`] for values
/// containing CR or LF, and [`Error::AttachmentRead`] if a requested
/// attachment cannot be read.
pub fn assemble<A>(email: &Email, source: &A) -> Result<Vec<u8>>
where
    A: AttachmentSource + ?Sized,
{
    validate_email(email)?;

    let attachment = match email.attachment() {
        Some(attachment) if attachment.with_file => {
            validate_header("attachment name", &attachment.name)?;
            validate_header("attachment content type", &attachment.content_type)?;
            let bytes = source
                .read(&attachment.name)
                .map_err(|source| Error::AttachmentRead {
                    name: attachment.name.clone(),
                    source,
                })?;
            Some((attachment, bytes))
        }
        _ => None,
    };

    let boundary = boundary_for(email.body());
    let headers = message_headers(email, &boundary)?;

    let mut out = Vec::with_capacity(
        512 + email.body().len() + attachment.as_ref().map_or(0, |(_, b)| b.len() * 4 / 3 + 128),
    );
    headers.write_to(&mut out);
    out.extend_from_slice(b"\r\n");

    write_delimiter(&mut out, &boundary);
    write_line(&mut out, &format!("Content-Type: {}", ContentType::text_plain()));
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(email.body().as_bytes());
    out.extend_from_slice(b"\r\n");

    if let Some((attachment, bytes)) = attachment {
        let content_type = ContentType::attachment(&attachment.content_type, &attachment.name);
        write_delimiter(&mut out, &boundary);
        write_line(&mut out, "Content-Transfer-Encoding: base64");
        write_line(&mut out, "Content-Disposition: attachment");
        write_line(&mut out, &format!("Content-Type: {content_type}"));
        out.extend_from_slice(b"\r\n");
        write_folded_base64(&mut out, &bytes);
    }

    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"--\r\n");

    Ok(out)
}

fn message_headers(email: &Email, boundary: &str) -> Result<Headers> {
    let mut headers = Headers::new();
    headers.add("From", email.from())?;
    if !email.to().is_empty() {
        headers.add("To", email.to().join(", "))?;
    }
    if !email.cc().is_empty() {
        headers.add("CC", email.cc().join(", "))?;
    }
    headers.add("Subject", email.subject())?;
    headers.add("Content-Type", ContentType::multipart_mixed(boundary).to_string())?;
    headers.add("Mime-Version", "1.0")?;
    Ok(headers)
}

fn write_delimiter(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn write_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(b"\r\n");
}
