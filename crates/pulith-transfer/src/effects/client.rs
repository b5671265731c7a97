//! The transfer executor.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, debug_span, error, warn};

use super::body::{BufferSource, FileSource, UploadSource};
use super::sink::ResponseSink;
use super::transport::{ProgressObserver, TransferIo, Transport, UploadStream};
use crate::core::{
    NormalizeContext, form_body, header_line, install_expect_override, normalize_progress,
    parse_response_headers, select_method,
};
use crate::data::{
    ActionType, ClientConfig, FormPart, HeaderItem, HeaderList, OutputTarget, ParamStore,
    Progress, ProgressControl, ProxyKind, RawValue, RequestBody, RequestMethod, TransferPhase,
    TransferState, TransportOption,
};
use crate::error::{Error, Result, TransportError, TransportErrorKind};
use crate::global;

const NO_PROXY_HOSTS: &str = "localhost,127.0.0.1";

/// Body of a raw upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPayload {
    File(PathBuf),
    Data(Vec<u8>),
}

type ProgressCallback = Box<dyn FnMut(&Progress) -> ProgressControl + Send>;

/// Executes one HTTP exchange at a time over a [`Transport`].
///
/// Query params, request headers, the output file, the explicit method and the
/// chunk window are collected between calls and consumed by the next `do_*`
/// call, successful or not. Response body and headers stay available until the
/// next transfer starts.
///
/// A client is not meant to be shared between threads while a transfer runs;
/// give each worker its own client.
///
/// # Examples
///
/// ```
/// use pulith_transfer::{StubResponse, StubTransport, TransferClient};
///
/// let transport = StubTransport::new().with_response(StubResponse::ok("ok"));
/// let mut client = TransferClient::new(transport);
/// client.add_query_header("X-Test", "1");
///
/// client.do_get(Some("http://example.test/")).unwrap();
/// assert_eq!(client.response_body(), b"ok");
/// assert_eq!(client.response_code(), 200);
/// ```
pub struct TransferClient<T: Transport> {
    transport: T,
    params: ParamStore,
    headers: HeaderList,
    response_headers: HeaderList,
    header_text: Vec<u8>,
    sink: ResponseSink,
    state: TransferState,
    phase: TransferPhase,
    user_agent: String,
    progress: Option<ProgressCallback>,
    last_error: Option<TransportError>,
    response_code_checking: bool,
    treat_errors_as_warnings: bool,
}

impl<T: Transport> TransferClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, &ClientConfig::default())
    }

    pub fn with_config(transport: T, config: &ClientConfig) -> Self {
        let runtime = global::ensure_initialized();

        let mut client = Self {
            transport,
            params: ParamStore::new(),
            headers: HeaderList::new(),
            response_headers: HeaderList::new(),
            header_text: Vec::new(),
            sink: ResponseSink::new(),
            state: TransferState::default(),
            phase: TransferPhase::Idle,
            user_agent: config.user_agent.clone(),
            progress: None,
            last_error: None,
            response_code_checking: config.response_code_checking,
            treat_errors_as_warnings: config.treat_errors_as_warnings,
        };
        client.apply_config(config, runtime.ca_bundle());
        client
    }

    fn apply_config(&mut self, config: &ClientConfig, default_ca_bundle: Option<&Path>) {
        self.configure(TransportOption::FollowRedirects(config.follow_redirects));
        self.configure(TransportOption::AutoReferer(config.auto_referer));
        self.configure(TransportOption::VerifyPeer(config.verify_tls));
        self.configure(TransportOption::VerifyHost(config.verify_tls));
        self.configure(TransportOption::AcceptEncoding(config.accept_encoding.clone()));
        self.configure(TransportOption::CookieEngine(config.cookies));
        self.configure(TransportOption::ReceiveBufferSize(config.receive_buffer_size));
        self.configure(TransportOption::UploadBufferSize(config.upload_buffer_size));

        if let Some(ca_bundle) = config.ca_bundle.as_deref().or(default_ca_bundle) {
            self.configure(TransportOption::CaBundle(ca_bundle.to_path_buf()));
        }
        if let Some(referer) = &config.referer {
            self.configure(TransportOption::Referer(referer.clone()));
        }
        if let Some(proxy) = &config.proxy {
            self.set_proxy(&proxy.host, proxy.port, proxy.kind);
            self.set_proxy_credentials(&proxy.username, &proxy.password);
        }
    }

    fn configure(&mut self, option: TransportOption) {
        if let Err(e) = self.transport.configure(option) {
            warn!(error = %e, "transport rejected option");
        }
    }

    // ---- accumulation between transfers ----

    pub fn add_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.add_text(name, value);
        self
    }

    /// Attach a file to the next multipart upload, like an `<input type="file">` field.
    ///
    /// `display_name` is the file name sent to the server; `content_type` may be empty.
    pub fn add_query_param_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        display_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> &mut Self {
        self.params.add_file(name, path, display_name, content_type);
        self
    }

    /// Add a request header for the next transfer.
    ///
    /// An empty value removes the header; [`EMPTY_HEADER_VALUE`](crate::EMPTY_HEADER_VALUE)
    /// sends it with no value. Names are not validated.
    pub fn add_query_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push(name, value);
        self
    }

    // ---- configuration ----

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.state.url = url.into();
        let url = self.state.url.clone();
        self.configure(TransportOption::Url(url));
        self
    }

    /// Explicit method for the next transfer. `GET`, `POST`, `PUT` and `HEAD` are
    /// understood, anything else is sent as a custom verb.
    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.state.method = method.into();
        self
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn set_referer(&mut self, referer: impl Into<String>) -> &mut Self {
        self.configure(TransportOption::Referer(referer.into()));
        self
    }

    pub fn set_proxy(&mut self, host: impl Into<String>, port: u16, kind: ProxyKind) -> &mut Self {
        self.configure(TransportOption::Proxy {
            host: host.into(),
            port,
            kind,
        });
        self.configure(TransportOption::NoProxy(NO_PROXY_HOSTS.to_string()));
        self
    }

    /// Proxy credentials. Both parts empty clears them.
    pub fn set_proxy_credentials(&mut self, username: &str, password: &str) -> &mut Self {
        let credentials = if username.is_empty() && password.is_empty() {
            None
        } else {
            Some(format!(
                "{}:{}",
                self.transport.escape(username),
                self.transport.escape(password)
            ))
        };
        self.configure(TransportOption::ProxyCredentials(credentials));
        self
    }

    /// Write the next response body to `path` instead of memory.
    pub fn set_output_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.state.output = OutputTarget::File(path.into());
        self
    }

    pub fn set_upload_buffer_size(&mut self, size: usize) -> &mut Self {
        self.configure(TransportOption::UploadBufferSize(size));
        self
    }

    pub fn set_chunk_offset(&mut self, offset: u64) -> &mut Self {
        self.state.chunk_offset = Some(offset);
        self
    }

    pub fn set_chunk_size(&mut self, size: u64) -> &mut Self {
        self.state.chunk_size = Some(size);
        self
    }

    pub fn set_treat_errors_as_warnings(&mut self, treat: bool) -> &mut Self {
        self.treat_errors_as_warnings = treat;
        self
    }

    /// Toggle response-code logging for the next transfer only.
    pub fn enable_response_code_checking(&mut self, enable: bool) -> &mut Self {
        self.response_code_checking = enable;
        self
    }

    /// Register a progress callback. Returning [`ProgressControl::Abort`] stops
    /// the transfer in flight and makes the call fail.
    pub fn set_progress_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&Progress) -> ProgressControl + Send + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn clear_progress_callback(&mut self) -> &mut Self {
        self.progress = None;
        self
    }

    /// Pass an option the typed setters do not cover straight to the transport.
    pub fn set_transport_option(&mut self, key: u32, value: RawValue) -> std::result::Result<(), TransportError> {
        self.transport.configure(TransportOption::Raw { key, value })
    }

    // ---- transfers ----

    /// GET the configured URL, or `url` when given.
    pub fn do_get(&mut self, url: Option<&str>) -> Result<()> {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.set_url(url);
        }

        self.begin(ActionType::Get);
        self.apply_method(RequestMethod::Get);
        self.configure(TransportOption::Body(RequestBody::None));
        self.execute(None)
    }

    /// POST `data` verbatim, or the urlencoded query params when `data` is empty.
    pub fn do_post(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        self.begin(ActionType::Post);
        self.apply_method(RequestMethod::Post);

        let data = data.as_ref();
        let body = if data.is_empty() {
            let transport = &self.transport;
            form_body(&self.params, |s| transport.escape(s)).into_bytes()
        } else {
            data.to_vec()
        };
        self.configure(TransportOption::Body(RequestBody::Fields(body)));
        self.execute(None)
    }

    /// Send every query param as a `multipart/form-data` body.
    pub fn do_upload_multipart(&mut self) -> Result<()> {
        self.begin(ActionType::Upload);
        self.apply_method(RequestMethod::Post);

        let parts = self.params.iter().map(FormPart::from).collect();
        self.configure(TransportOption::Body(RequestBody::Multipart(parts)));
        self.execute(None)
    }

    /// Send a file or a buffer as the literal request body.
    ///
    /// With a chunk window set only that byte range is sent and its size is
    /// declared. A missing or unreadable file fails before anything is
    /// configured, leaving params and headers in place.
    pub fn do_upload(&mut self, payload: UploadPayload) -> Result<()> {
        let window = self.state.chunk_window();
        let (source, action) = match payload {
            UploadPayload::File(path) => (
                UploadSource::File(FileSource::open(&path, window)?),
                ActionType::Upload,
            ),
            UploadPayload::Data(data) => (
                UploadSource::Buffer(BufferSource::new(data, window)),
                ActionType::Post,
            ),
        };
        let declared = source.declared_size();

        if select_method(&self.state.method, RequestMethod::Post) != RequestMethod::Put {
            self.headers.push("Content-Length", declared.to_string());
        }

        self.begin(action);
        self.state.current_file_size = Some(source.total_size());
        self.state.current_upload_size = Some(declared);
        self.apply_method(RequestMethod::Post);
        self.configure(TransportOption::Body(RequestBody::Streamed { size: declared }));
        self.configure(TransportOption::UploadSize(Some(declared)));
        self.execute(Some(source))
    }

    // ---- state machine ----

    fn begin(&mut self, action: ActionType) {
        self.phase = TransferPhase::Configuring;
        self.cleanup_before();
        self.state.action = action;

        let user_agent = self.user_agent.clone();
        self.configure(TransportOption::UserAgent(user_agent));
        let lines = self.headers.iter().map(header_line).collect();
        self.configure(TransportOption::Headers(lines));
    }

    fn cleanup_before(&mut self) {
        install_expect_override(&mut self.headers);
        self.response_headers.clear();
        self.header_text.clear();
        self.sink.reset(self.state.output.clone());
        self.last_error = None;
    }

    fn apply_method(&mut self, implicit: RequestMethod) {
        let method = select_method(&self.state.method, implicit);
        self.configure(TransportOption::Method(method));
    }

    fn execute(&mut self, mut upload: Option<UploadSource>) -> Result<()> {
        let span = debug_span!("transfer", action = ?self.state.action, url = %self.state.url);
        let _enter = span.enter();

        self.phase = TransferPhase::InFlight;
        debug!(phase = %self.phase, headers = self.headers.len(), "starting transfer");

        let ctx = NormalizeContext {
            action: self.state.action,
            chunk: self.state.chunk_window(),
            file_size: self.state.current_file_size,
        };
        let outcome = {
            let mut relay = ProgressRelay {
                callback: self.progress.as_mut(),
                ctx,
            };
            let io = TransferIo {
                upload: upload.as_mut().map(|u| u as &mut (dyn UploadStream + Send)),
                body: &mut self.sink,
                headers: &mut self.header_text,
                progress: &mut relay,
            };
            self.transport.perform(io)
        };
        drop(upload);

        self.complete(outcome)
    }

    fn complete(&mut self, outcome: std::result::Result<(), TransportError>) -> Result<()> {
        self.phase = TransferPhase::Completing;
        let outcome = match (outcome, self.sink.close()) {
            (Ok(()), Err(e)) => {
                warn!(error = %e, "failed to close output file");
                Err(TransportError::new(TransportErrorKind::WriteError, e.to_string()))
            }
            (outcome, _) => outcome,
        };
        if let Err(e) = &outcome {
            debug!(error = %e, "transport reported failure");
        }
        self.last_error = outcome.as_ref().err().cloned();

        self.check_response();
        self.cleanup_after();
        self.response_headers = parse_response_headers(&String::from_utf8_lossy(&self.header_text));

        self.phase = TransferPhase::Idle;
        debug!(
            code = self.transport.response_code(),
            headers = self.response_headers.len(),
            "transfer finished"
        );
        outcome.map_err(Error::from)
    }

    fn check_response(&self) {
        if !self.response_code_checking {
            return;
        }
        let code = self.transport.response_code();
        let aborted = self.last_error.as_ref().is_some_and(TransportError::is_aborted);
        if aborted || !(code == 0 || (400..=499).contains(&code)) {
            return;
        }

        let body = String::from_utf8_lossy(self.sink.body());
        if self.treat_errors_as_warnings {
            warn!(url = %self.state.url, code, error = self.error_string(), %body, "request failed");
        } else {
            error!(url = %self.state.url, code, error = self.error_string(), %body, "request failed");
        }
    }

    fn cleanup_after(&mut self) {
        self.params.clear();
        self.headers.clear();
        self.state.reset();
        self.configure(TransportOption::UploadSize(None));
        self.response_code_checking = true;
    }

    // ---- results ----

    /// Response body captured in memory; empty when an output file was set.
    pub fn response_body(&self) -> &[u8] {
        self.sink.body()
    }

    pub fn response_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.sink.body())
    }

    /// HTTP status of the last response, 0 if none arrived.
    pub fn response_code(&self) -> i64 {
        self.transport.response_code()
    }

    /// Raw header text of the last transfer, including every redirect hop.
    pub fn response_header_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.header_text)
    }

    /// First response header called `name`, ignoring case.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers.get(name)
    }

    pub fn response_header_at(&self, index: usize) -> Option<&HeaderItem> {
        self.response_headers.get_index(index)
    }

    pub fn response_header_count(&self) -> usize {
        self.response_headers.len()
    }

    pub fn response_headers(&self) -> &HeaderList {
        &self.response_headers
    }

    /// Detail text of the last transport failure, empty after success.
    pub fn error_string(&self) -> &str {
        self.last_error.as_ref().map_or("", |e| e.detail.as_str())
    }

    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// Numeric transport result of the last transfer, 0 on success.
    pub fn result_code(&self) -> i32 {
        self.last_error.as_ref().map_or(0, TransportError::code)
    }

    pub fn result_string(&self) -> &'static str {
        self.last_error.as_ref().map_or("No error", |e| e.kind.as_str())
    }

    pub fn url_encode(&self, input: &str) -> String {
        self.transport.escape(input)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn query_params(&self) -> &ParamStore {
        &self.params
    }

    pub fn query_headers(&self) -> &HeaderList {
        &self.headers
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for TransferClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferClient")
            .field("transport", &self.transport)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("progress", &self.progress.as_ref().map(|_| "{ ... }"))
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Hands normalized progress to the caller's callback.
struct ProgressRelay<'a> {
    callback: Option<&'a mut ProgressCallback>,
    ctx: NormalizeContext,
}

impl ProgressObserver for ProgressRelay<'_> {
    fn on_progress(&mut self, progress: Progress) -> ProgressControl {
        match &mut self.callback {
            Some(callback) => (**callback)(&normalize_progress(progress, &self.ctx)),
            None => ProgressControl::Continue,
        }
    }
}
