//! Attachment byte sources.

use std::io;
use std::path::PathBuf;

/// Resolves attachment bytes by declared name.
pub trait AttachmentSource: Send + Sync {
    /// Reads the bytes for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are unavailable.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<F> AttachmentSource for F
where
    F: Fn(&str) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self(name)
    }
}

/// Reads attachments from the filesystem.
///
/// Names are treated as paths, relative to `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    /// Resolves names relative to the process working directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Resolves names relative to `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl AttachmentSource for FsSource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        match &self.root {
            Some(root) => std::fs::read(root.join(name)),
            None => std::fs::read(name),
        }
    }
}
