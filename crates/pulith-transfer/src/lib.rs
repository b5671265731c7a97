//! Single-exchange HTTP transfers over a pluggable transport.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern used across pulith:
//! - [`data`] - Parameters, headers, options and configuration types
//! - [`core`] - Pure transformations (header parsing, progress normalization, request assembly)
//! - [`effects`] - Body provider, response sink, the [`Transport`] seam and the [`TransferClient`]
//!
//! # Key Features
//!
//! - **One transfer at a time**: every `do_*` call blocks until the exchange finishes
//! - **Streamed uploads**: file or buffer bodies pulled by the transport, with chunk windows for resumable uploads
//! - **Whole-file progress**: chunked uploads report progress relative to the full file
//! - **Per-transfer state**: params, headers and upload bounds never leak into the next call

pub mod core;
pub mod data;
pub mod effects;
mod error;
pub mod global;

pub use data::{
    ActionType, ChunkWindow, ClientConfig, EMPTY_HEADER_VALUE, FormPart, HeaderItem, HeaderList,
    OutputTarget, ParamStore, Progress, ProgressControl, ProxyConfig, ProxyKind, QueryParam,
    RawValue, RequestBody, RequestMethod, TransferPhase, TransferState, TransportOption,
};
pub use effects::{
    BodySink, BodySource, BufferSource, FileSource, ProgressObserver, ResponseSink, SeekOutcome,
    Seeker, StubResponse, StubTransport, TransferClient, TransferIo, Transport, UploadPayload,
    UploadSource, UploadStream, Whence,
};
pub use error::{Error, Result, TransportError, TransportErrorKind};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;
