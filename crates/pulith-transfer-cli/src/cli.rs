use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "pulith-transfer", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Client settings in TOML.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging, repeat for trace output. RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "g", name = "get", about = "Fetch a URL")]
    Get(GetArg),
    #[command(alias = "p", name = "post", about = "Post raw data or urlencoded fields")]
    Post(PostArg),
    #[command(alias = "m", name = "multipart", about = "Post a multipart form")]
    Multipart(MultipartArg),
    #[command(alias = "u", name = "upload", about = "Send a file as the request body")]
    Upload(UploadArg),
}

#[derive(Clone, Debug, Args)]
pub struct RequestArg {
    pub url: String,

    /// Request header as 'Name: value'. An empty value removes the header.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Write the response body here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Log 4xx responses as warnings.
    #[arg(long)]
    pub quiet_errors: bool,
}

#[derive(Clone, Debug, Args)]
pub struct GetArg {
    #[command(flatten)]
    pub request: RequestArg,
}

#[derive(Clone, Debug, Args)]
pub struct PostArg {
    #[command(flatten)]
    pub request: RequestArg,

    /// Raw body. Without it the params are sent urlencoded.
    #[arg(short, long, conflicts_with = "params")]
    pub data: Option<String>,

    /// Form field as 'name=value'.
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct MultipartArg {
    #[command(flatten)]
    pub request: RequestArg,

    /// Text field as 'name=value'.
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,

    /// File field as 'name=path'.
    #[arg(short = 'f', long = "file")]
    pub files: Vec<String>,
}

#[derive(Clone, Debug, Args)]
pub struct UploadArg {
    #[command(flatten)]
    pub request: RequestArg,

    pub file: PathBuf,

    /// Method to send instead of POST, e.g. PUT.
    #[arg(long)]
    pub method: Option<String>,

    /// Start of the byte range to send.
    #[arg(long, requires = "chunk_size")]
    pub chunk_offset: Option<u64>,

    /// Length of the byte range to send.
    #[arg(long, requires = "chunk_offset")]
    pub chunk_size: Option<u64>,
}

/// Split `name=value`.
pub fn parse_pair(input: &str) -> Result<(&str, &str)> {
    match input.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("expected 'name=value', got '{input}'"),
    }
}

/// Split `Name: value`; `Name:` alone yields an empty value.
pub fn parse_header(input: &str) -> Result<(&str, &str)> {
    let (name, value) = input
        .split_once(':')
        .with_context(|| format!("expected 'Name: value', got '{input}'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("header name missing in '{input}'");
    }
    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("a=1").unwrap(), ("a", "1"));
        assert_eq!(parse_pair("a=").unwrap(), ("a", ""));
        assert_eq!(parse_pair("a=b=c").unwrap(), ("a", "b=c"));
        assert!(parse_pair("=1").is_err());
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("X-Test: 1").unwrap(), ("X-Test", "1"));
        assert_eq!(parse_header("Accept:").unwrap(), ("Accept", ""));
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(": v").is_err());
    }

    #[test]
    fn test_upload_chunk_flags_go_together() {
        let parsed = App::try_parse_from([
            "pulith-transfer",
            "upload",
            "http://example.test/",
            "file.bin",
            "--chunk-offset",
            "10",
        ]);
        assert!(parsed.is_err());

        let parsed = App::try_parse_from([
            "pulith-transfer",
            "upload",
            "http://example.test/",
            "file.bin",
            "--method",
            "PUT",
            "--chunk-offset",
            "10",
            "--chunk-size",
            "20",
        ])
        .unwrap();
        match parsed.cmd {
            Commands::Upload(arg) => {
                assert_eq!(arg.method.as_deref(), Some("PUT"));
                assert_eq!((arg.chunk_offset, arg.chunk_size), (Some(10), Some(20)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
