//! Options handed to a [`Transport`](crate::Transport) before a transfer.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::params::QueryParam;

/// HTTP method of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    /// Raw upload of the request body.
    Put,
    Head,
    /// Any other verb, sent verbatim.
    Custom(String),
}

impl RequestMethod {
    /// Parse an explicit method string. An empty string selects nothing.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "" => None,
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "HEAD" => Some(Self::Head),
            other => Some(Self::Custom(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Head => "HEAD",
            Self::Custom(verb) => verb,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Http,
    Https,
    Socks4,
    Socks4a,
    Socks5,
    /// SOCKS5 with name resolution done by the proxy.
    Socks5h,
}

impl ProxyKind {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks4 => "socks4",
            Self::Socks4a => "socks4a",
            Self::Socks5 => "socks5",
            Self::Socks5h => "socks5h",
        }
    }
}

/// Value of a passthrough option addressed by numeric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Int(i64),
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    /// Streamed from disk by the transport.
    File {
        name: String,
        path: PathBuf,
        display_name: String,
        content_type: String,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

impl From<&QueryParam> for FormPart {
    fn from(param: &QueryParam) -> Self {
        if param.is_file {
            Self::File {
                name: param.name.clone(),
                path: PathBuf::from(&param.value),
                display_name: param.display_name.clone(),
                content_type: param.content_type.clone(),
            }
        } else {
            Self::Text {
                name: param.name.clone(),
                value: param.value.clone(),
            }
        }
    }
}

/// What the transport sends as the request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    None,
    /// Sent verbatim, urlencoded unless the caller supplied raw data.
    Fields(Vec<u8>),
    Multipart(Vec<FormPart>),
    /// Pulled from the upload stream in [`TransferIo`](crate::TransferIo).
    Streamed { size: u64 },
}

/// A single setting applied to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOption {
    Url(String),
    Method(RequestMethod),
    UserAgent(String),
    Referer(String),
    /// Serialized request header lines, see [`header_line`](crate::core::header_line).
    Headers(Vec<String>),
    Proxy {
        host: String,
        port: u16,
        kind: ProxyKind,
    },
    /// `user:password`, each half percent-escaped. `None` clears credentials.
    ProxyCredentials(Option<String>),
    NoProxy(String),
    CaBundle(PathBuf),
    UploadBufferSize(usize),
    ReceiveBufferSize(usize),
    /// Declared request body size; `None` means unknown.
    UploadSize(Option<u64>),
    Body(RequestBody),
    FollowRedirects(bool),
    AutoReferer(bool),
    VerifyPeer(bool),
    VerifyHost(bool),
    /// Accepted content encodings; an empty string accepts all the transport supports.
    AcceptEncoding(Option<String>),
    CookieEngine(bool),
    Raw { key: u32, value: RawValue },
}
