//! I/O for transfers.
//!
//! The [`Transport`] trait is the seam to the HTTP engine. Everything the
//! engine pulls from or pushes to during a transfer goes through the explicit
//! callback objects in [`TransferIo`].

mod body;
mod client;
mod sink;
mod stub;
mod transport;

#[cfg(feature = "reqwest")]
mod reqwest;

pub use body::{BufferSource, FileSource, UploadSource};
pub use client::{TransferClient, UploadPayload};
pub use sink::ResponseSink;
pub use stub::{RecordedPart, RecordedRequest, StubResponse, StubTransport};
pub use transport::{
    BodySink, BodySource, ProgressObserver, SeekOutcome, Seeker, TransferIo, Transport,
    UploadStream, Whence,
};

#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestTransport;
