//! Server connection configuration.

use std::fmt;

/// How TLS is established.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Security {
    /// Plain TCP, upgraded with STARTTLS whenever the server advertises it.
    #[default]
    Opportunistic,
    /// TLS from the first byte (submissions port 465).
    Implicit,
}

/// Address and credentials of an SMTP server.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    /// Server hostname, also the TLS certificate name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Username for authentication; empty disables AUTH.
    #[cfg_attr(feature = "serde", serde(default))]
    pub username: String,
    /// Password for authentication.
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: String,
    /// TLS mode.
    #[cfg_attr(feature = "serde", serde(default))]
    pub security: Security,
    /// Name announced in EHLO/HELO.
    #[cfg_attr(feature = "serde", serde(default = "default_client_hostname"))]
    pub client_hostname: String,
}

fn default_client_hostname() -> String {
    "localhost".to_string()
}

impl ServerConfig {
    /// Creates a new configuration without credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
            security: Security::default(),
            client_hostname: default_client_hostname(),
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the TLS mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the name announced in EHLO/HELO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Returns true if a username is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("client_hostname", &self.client_hostname)
            .finish()
    }
}
