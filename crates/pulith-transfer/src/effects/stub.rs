//! Scripted transport for tests and dry runs.

use std::collections::VecDeque;
use std::fs;

use super::transport::{
    BodySink, BodySource, ProgressObserver, SeekOutcome, Seeker, TransferIo, Transport,
    UploadStream, Whence,
};
use crate::data::{
    FormPart, Progress, ProgressControl, RequestBody, RequestMethod, TransportOption,
};
use crate::error::{TransportError, TransportErrorKind};

const DEFAULT_IO_CHUNK: usize = 16 * 1024;

/// Canned response served by [`StubTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubResponse {
    pub status: i64,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Reported after the response is delivered, or instead of it when `status` is 0.
    pub failure: Option<TransportError>,
}

impl StubResponse {
    pub fn new(status: i64) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            failure: None,
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200).with_body(body)
    }

    /// No response at all, the exchange fails with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::new(0).with_failure(error)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_failure(mut self, error: TransportError) -> Self {
        self.failure = Some(error);
        self
    }

    fn header_text(&self) -> String {
        let mut text = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in &self.headers {
            text.push_str(&format!("{name}: {value}\r\n"));
        }
        text.push_str("\r\n");
        text
    }
}

impl Default for StubResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

/// A multipart part as the stub received it, file contents included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPart {
    pub name: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// One exchange seen by [`StubTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordedRequest {
    pub url: String,
    pub method: RequestMethod,
    pub user_agent: String,
    pub header_lines: Vec<String>,
    /// Form fields or the streamed upload, as sent.
    pub body: Vec<u8>,
    pub multipart: Vec<RecordedPart>,
    pub upload_size: Option<u64>,
}

/// A [`Transport`] that serves queued [`StubResponse`]s and records what it was asked to send.
///
/// Streamed bodies are pulled in upload-buffer sized reads with upload progress
/// after each one; response bodies are pushed in receive-buffer sized writes
/// with download progress, so abort and short-write paths behave as they would
/// on the wire.
#[derive(Debug)]
pub struct StubTransport {
    responses: VecDeque<StubResponse>,
    fallback: StubResponse,
    options: Vec<TransportOption>,
    requests: Vec<RecordedRequest>,
    url: String,
    method: RequestMethod,
    user_agent: String,
    headers: Vec<String>,
    body: RequestBody,
    upload_size: Option<u64>,
    upload_chunk: usize,
    receive_chunk: usize,
    rewind_before_send: bool,
    response_code: i64,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            fallback: StubResponse::default(),
            options: Vec::new(),
            requests: Vec::new(),
            url: String::new(),
            method: RequestMethod::Get,
            user_agent: String::new(),
            headers: Vec::new(),
            body: RequestBody::None,
            upload_size: None,
            upload_chunk: DEFAULT_IO_CHUNK,
            receive_chunk: DEFAULT_IO_CHUNK,
            rewind_before_send: false,
            response_code: 0,
        }
    }

    /// Queue a response for the next exchange.
    #[must_use]
    pub fn with_response(mut self, response: StubResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    /// Served once the queue is empty. Defaults to an empty 200.
    #[must_use]
    pub fn with_fallback(mut self, response: StubResponse) -> Self {
        self.fallback = response;
        self
    }

    /// Seek streamed bodies back to the start before sending, as a transport
    /// does when it has to resend after a redirect or auth challenge.
    #[must_use]
    pub fn with_rewind(mut self) -> Self {
        self.rewind_before_send = true;
        self
    }

    pub fn push_response(&mut self, response: StubResponse) {
        self.responses.push_back(response);
    }

    pub fn requests(&self) -> &[RecordedRequest] {
        &self.requests
    }

    pub fn last_request(&self) -> Option<&RecordedRequest> {
        self.requests.last()
    }

    /// Every option applied so far, in order.
    pub fn options(&self) -> &[TransportOption] {
        &self.options
    }

    pub fn upload_size(&self) -> Option<u64> {
        self.upload_size
    }

    fn exchange(
        &mut self,
        response: &StubResponse,
        request: &mut RecordedRequest,
        io: TransferIo<'_>,
    ) -> Result<(), TransportError> {
        let TransferIo {
            upload,
            body,
            headers,
            progress,
        } = io;

        match &self.body {
            RequestBody::None => {}
            RequestBody::Fields(data) => request.body = data.clone(),
            RequestBody::Multipart(parts) => request.multipart = record_parts(parts)?,
            RequestBody::Streamed { size } => {
                let upload = upload.ok_or_else(|| {
                    TransportError::new(TransportErrorKind::ReadError, "no upload stream supplied")
                })?;
                if self.rewind_before_send && upload.seek(0, Whence::Start) != SeekOutcome::Ok {
                    return Err(TransportError::new(
                        TransportErrorKind::SendFailRewind,
                        "send failed since rewinding of the data stream failed",
                    ));
                }
                request.body = pump_upload(upload, *size, self.upload_chunk, progress)?;
            }
        }

        if response.status == 0 {
            return match &response.failure {
                Some(failure) => Err(failure.clone()),
                None => Err(TransportError::new(
                    TransportErrorKind::CouldntConnect,
                    "no response scripted",
                )),
            };
        }

        self.response_code = response.status;
        let header_text = response.header_text();
        if headers.write(header_text.as_bytes()) != header_text.len() {
            return Err(write_error());
        }
        deliver_body(&response.body, self.receive_chunk, body, progress)?;

        match &response.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StubTransport {
    fn configure(&mut self, option: TransportOption) -> Result<(), TransportError> {
        match &option {
            TransportOption::Url(url) => self.url = url.clone(),
            TransportOption::Method(method) => self.method = method.clone(),
            TransportOption::UserAgent(agent) => self.user_agent = agent.clone(),
            TransportOption::Headers(lines) => self.headers = lines.clone(),
            TransportOption::Body(body) => self.body = body.clone(),
            TransportOption::UploadSize(size) => self.upload_size = *size,
            TransportOption::UploadBufferSize(size) => self.upload_chunk = (*size).max(1),
            TransportOption::ReceiveBufferSize(size) => self.receive_chunk = (*size).max(1),
            _ => {}
        }
        self.options.push(option);
        Ok(())
    }

    fn perform(&mut self, io: TransferIo<'_>) -> Result<(), TransportError> {
        let response = self
            .responses
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        self.response_code = 0;

        let mut request = RecordedRequest {
            url: self.url.clone(),
            method: self.method.clone(),
            user_agent: self.user_agent.clone(),
            header_lines: self.headers.clone(),
            upload_size: self.upload_size,
            ..RecordedRequest::default()
        };
        let result = self.exchange(&response, &mut request, io);
        self.requests.push(request);
        result
    }

    fn response_code(&self) -> i64 {
        self.response_code
    }
}

fn record_parts(parts: &[FormPart]) -> Result<Vec<RecordedPart>, TransportError> {
    parts
        .iter()
        .map(|part| match part {
            FormPart::Text { name, value } => Ok(RecordedPart {
                name: name.clone(),
                data: value.clone().into_bytes(),
                file_name: None,
                content_type: None,
            }),
            FormPart::File {
                name,
                path,
                display_name,
                content_type,
            } => {
                let data = fs::read(path).map_err(|e| {
                    TransportError::new(
                        TransportErrorKind::FileCouldntRead,
                        format!("couldn't open file \"{}\": {e}", path.display()),
                    )
                })?;
                Ok(RecordedPart {
                    name: name.clone(),
                    data,
                    file_name: Some(display_name.clone()),
                    content_type: (!content_type.is_empty()).then(|| content_type.clone()),
                })
            }
        })
        .collect()
}

fn pump_upload(
    upload: &mut (dyn UploadStream + Send),
    size: u64,
    chunk: usize,
    progress: &mut (dyn ProgressObserver + Send),
) -> Result<Vec<u8>, TransportError> {
    let mut buf = vec![0u8; chunk];
    let mut sent = Vec::new();
    loop {
        let n = upload
            .read(&mut buf)
            .map_err(|e| TransportError::new(TransportErrorKind::ReadError, e.to_string()))?;
        if n == 0 {
            return Ok(sent);
        }
        sent.extend_from_slice(&buf[..n]);
        if progress.on_progress(Progress::upload(size, sent.len() as u64)) == ProgressControl::Abort {
            return Err(TransportError::aborted());
        }
    }
}

fn deliver_body(
    data: &[u8],
    chunk: usize,
    sink: &mut dyn BodySink,
    progress: &mut (dyn ProgressObserver + Send),
) -> Result<(), TransportError> {
    let total = data.len() as u64;
    let mut delivered = 0u64;
    for piece in data.chunks(chunk) {
        if sink.write(piece) != piece.len() {
            return Err(write_error());
        }
        delivered += piece.len() as u64;
        if progress.on_progress(Progress::download(total, delivered)) == ProgressControl::Abort {
            return Err(TransportError::aborted());
        }
    }
    Ok(())
}

fn write_error() -> TransportError {
    TransportError::new(
        TransportErrorKind::WriteError,
        "Failure writing output to destination",
    )
}
