//! Client configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::options::ProxyKind;
use crate::error::{Error, Result};

/// Settings applied to a [`TransferClient`](crate::TransferClient) at construction.
///
/// # Examples
///
/// ```
/// use pulith_transfer::ClientConfig;
///
/// let config = ClientConfig::default()
///     .user_agent("pulith/0.1")
///     .follow_redirects(false);
/// assert!(!config.follow_redirects);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub referer: Option<String>,
    pub follow_redirects: bool,
    pub auto_referer: bool,
    /// Verify the peer certificate and host name.
    pub verify_tls: bool,
    /// Accepted content encodings. `Some("")` accepts everything the transport supports.
    pub accept_encoding: Option<String>,
    pub cookies: bool,
    pub upload_buffer_size: usize,
    pub receive_buffer_size: usize,
    /// Overrides the process-wide CA bundle.
    pub ca_bundle: Option<PathBuf>,
    pub proxy: Option<ProxyConfig>,
    /// Log responses with code 0 or 4xx after each transfer.
    pub response_code_checking: bool,
    /// Log response-code problems as warnings instead of errors.
    pub treat_errors_as_warnings: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            referer: None,
            follow_redirects: true,
            auto_referer: true,
            verify_tls: true,
            accept_encoding: Some(String::new()),
            cookies: true,
            upload_buffer_size: 65536,
            receive_buffer_size: 32768,
            ca_bundle: None,
            proxy: None,
            response_code_checking: true,
            treat_errors_as_warnings: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub kind: ProxyKind,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    #[must_use]
    pub fn upload_buffer_size(mut self, size: usize) -> Self {
        self.upload_buffer_size = size;
        self
    }

    #[must_use]
    pub fn receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    #[must_use]
    pub fn ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn treat_errors_as_warnings(mut self, treat: bool) -> Self {
        self.treat_errors_as_warnings = treat;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            user_agent = "uploader/2.0"
            follow_redirects = false
            upload_buffer_size = 1024

            [proxy]
            host = "127.0.0.1"
            port = 8888
            kind = "socks5h"
            "#,
        )
        .unwrap();

        assert_eq!(config.user_agent, "uploader/2.0");
        assert!(!config.follow_redirects);
        assert_eq!(config.upload_buffer_size, 1024);
        assert!(config.verify_tls);

        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.port, 8888);
        assert_eq!(proxy.kind, ProxyKind::Socks5h);
        assert!(proxy.username.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientConfig::from_toml_str("follow_redirects = \"maybe\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
