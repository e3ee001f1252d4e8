//! Outgoing message description.

/// Attachment descriptor.
///
/// The bytes themselves are resolved by name through an
/// [`AttachmentSource`](crate::AttachmentSource) at assembly time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attachment {
    /// Display name, also the key used to look the bytes up.
    pub name: String,
    /// Declared content type (e.g., `image/jpeg`).
    pub content_type: String,
    /// Whether file bytes should be attached.
    pub with_file: bool,
}

impl Attachment {
    /// Creates a descriptor for a file that should be attached.
    #[must_use]
    pub fn file(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            with_file: true,
        }
    }
}

/// An email message to send.
///
/// Built once through [`EmailBuilder`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Email {
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: String,
    attachment: Option<Attachment>,
}

impl Email {
    /// Starts building a message.
    #[must_use]
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }

    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Primary recipients.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Carbon-copy recipients.
    #[must_use]
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    /// Blind-carbon-copy recipients.
    #[must_use]
    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plain text body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Attachment descriptor, if any.
    #[must_use]
    pub const fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Envelope recipients: `to`, then `cc`, then `bcc`, duplicates kept.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }
}

/// Builder for [`Email`].
#[derive(Debug, Clone, Default)]
pub struct EmailBuilder {
    email: Email,
}

impl EmailBuilder {
    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.email.from = address.into();
        self
    }

    /// Sets the primary recipients.
    #[must_use]
    pub fn to<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.email.to = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the carbon-copy recipients.
    #[must_use]
    pub fn cc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.email.cc = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the blind-carbon-copy recipients.
    #[must_use]
    pub fn bcc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.email.bcc = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.email.subject = subject.into();
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.email.body = body.into();
        self
    }

    /// Sets the attachment descriptor.
    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.email.attachment = Some(attachment);
        self
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(self) -> Email {
        self.email
    }
}
