use std::io;

use crate::data::{Progress, ProgressControl, TransportOption};
use crate::error::TransportError;

/// The HTTP engine a [`TransferClient`](crate::TransferClient) drives.
///
/// Options set through [`configure`](Transport::configure) persist until
/// changed, like settings on a connection handle. [`perform`](Transport::perform)
/// runs one blocking exchange using the callbacks in [`TransferIo`].
///
/// # Implementations
///
/// - [`ReqwestTransport`](crate::ReqwestTransport): production transport on `reqwest::blocking`
/// - [`StubTransport`](crate::StubTransport): scripted responses for tests
pub trait Transport {
    fn configure(&mut self, option: TransportOption) -> Result<(), TransportError>;

    /// Perform the configured exchange, blocking until it completes, fails or
    /// is aborted through the progress observer.
    fn perform(&mut self, io: TransferIo<'_>) -> Result<(), TransportError>;

    /// Status code of the last response, 0 when none was received.
    fn response_code(&self) -> i64;

    fn escape(&self, input: &str) -> String {
        crate::core::escape(input)
    }
}

/// Origin for [`Seeker::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    Ok,
    /// The seek was attempted and failed.
    Fail,
    /// This source cannot seek that way. The transport must fail rather than resend.
    CantSeek,
}

/// Pull side of the request body.
pub trait BodySource {
    /// Fill `buf` with the next bytes of the body. `Ok(0)` ends the body.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

pub trait Seeker {
    fn seek(&mut self, offset: i64, whence: Whence) -> SeekOutcome;
}

/// A seekable request body with a size known up front.
pub trait UploadStream: BodySource + Seeker {
    /// Size to announce for the body, used for `Content-Length` framing.
    fn declared_size(&self) -> u64;
}

/// Receives response bytes.
pub trait BodySink {
    /// Returns the number of bytes accepted. Accepting fewer than offered
    /// makes the transport fail with a write error.
    fn write(&mut self, data: &[u8]) -> usize;
}

impl BodySink for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> usize {
        self.extend_from_slice(data);
        data.len()
    }
}

/// Receives progress updates. Must return promptly.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: Progress) -> ProgressControl;
}

impl<F> ProgressObserver for F
where
    F: FnMut(Progress) -> ProgressControl,
{
    fn on_progress(&mut self, progress: Progress) -> ProgressControl {
        self(progress)
    }
}

/// Callback objects for one transfer.
pub struct TransferIo<'a> {
    /// Present for streamed bodies only.
    pub upload: Option<&'a mut (dyn UploadStream + Send)>,
    pub body: &'a mut dyn BodySink,
    pub headers: &'a mut dyn BodySink,
    pub progress: &'a mut (dyn ProgressObserver + Send),
}
