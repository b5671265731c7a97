//! [`Transport`] on top of `reqwest::blocking`.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;
use std::time::Duration;

use ::reqwest::blocking::multipart::{Form, Part};
use ::reqwest::blocking::{Body, Client, RequestBuilder, Response};
use ::reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use ::reqwest::redirect::Policy;
use ::reqwest::{Certificate, Method, NoProxy, Proxy};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use super::transport::{
    BodySink, BodySource, ProgressObserver, TransferIo, Transport, UploadStream,
};
use crate::core::{HeaderDirective, parse_header_line};
use crate::data::{
    FormPart, Progress, ProgressControl, ProxyKind, RequestBody, RequestMethod, TransportOption,
};
use crate::error::{TransportError, TransportErrorKind};

const MAX_REDIRECTS: usize = 50;
/// Chunks buffered between the upload pump and the connection.
const PUMP_DEPTH: usize = 4;
const PUMP_BACKOFF: Duration = Duration::from_millis(5);
const DEFAULT_PART_TYPE: &str = "application/octet-stream";

/// Settings that live on the `reqwest` client rather than on a request.
/// Changing any of them rebuilds the client before the next transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientSettings {
    follow_redirects: bool,
    auto_referer: bool,
    verify_peer: bool,
    verify_host: bool,
    accept_encoding: Option<String>,
    cookies: bool,
    ca_bundle: Option<PathBuf>,
    proxy: Option<(String, u16, ProxyKind)>,
    proxy_credentials: Option<String>,
    no_proxy: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            auto_referer: true,
            verify_peer: true,
            verify_host: true,
            accept_encoding: Some(String::new()),
            cookies: true,
            ca_bundle: None,
            proxy: None,
            proxy_credentials: None,
            no_proxy: None,
        }
    }
}

impl ClientSettings {
    fn build(&self) -> Result<Client, TransportError> {
        let redirect = if self.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };
        let gzip = self
            .accept_encoding
            .as_deref()
            .is_some_and(|enc| enc.is_empty() || enc.contains("gzip"));

        let mut builder = Client::builder()
            .timeout(None::<Duration>)
            .redirect(redirect)
            .referer(self.auto_referer)
            .danger_accept_invalid_certs(!self.verify_peer)
            .danger_accept_invalid_hostnames(!self.verify_host)
            .cookie_store(self.cookies)
            .gzip(gzip);

        if let Some(path) = &self.ca_bundle {
            let pem = fs::read(path).map_err(|e| {
                TransportError::new(
                    TransportErrorKind::SslCaCert,
                    format!("error reading CA bundle {}: {e}", path.display()),
                )
            })?;
            let certs = Certificate::from_pem_bundle(&pem)
                .map_err(|e| TransportError::new(TransportErrorKind::SslCaCert, e.to_string()))?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        if let Some(proxy) = self.proxy()? {
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, error_chain(&e)))
    }

    fn proxy(&self) -> Result<Option<Proxy>, TransportError> {
        let Some((host, port, kind)) = &self.proxy else {
            return Ok(None);
        };
        if host.is_empty() {
            return Ok(None);
        }

        let mut proxy = Proxy::all(format!("{}://{host}:{port}", kind.scheme())).map_err(|e| {
            TransportError::new(TransportErrorKind::CouldntResolveProxy, e.to_string())
        })?;
        if let Some(credentials) = &self.proxy_credentials {
            let (user, password) = credentials
                .split_once(':')
                .unwrap_or((credentials.as_str(), ""));
            proxy = proxy.basic_auth(
                &percent_decode_str(user).decode_utf8_lossy(),
                &percent_decode_str(password).decode_utf8_lossy(),
            );
        }
        if let Some(hosts) = &self.no_proxy {
            proxy = proxy.no_proxy(NoProxy::from_string(hosts));
        }
        Ok(Some(proxy))
    }
}

/// Production transport.
///
/// Redirects, cookies, decompression and TLS are handled by `reqwest`. Streamed
/// request bodies are pulled from the [`UploadStream`] on a pump thread that
/// lives only as long as the request.
#[derive(Debug)]
pub struct ReqwestTransport {
    settings: ClientSettings,
    client: Option<(ClientSettings, Client)>,
    url: String,
    method: RequestMethod,
    user_agent: String,
    referer: Option<String>,
    header_lines: Vec<String>,
    body: RequestBody,
    upload_size: Option<u64>,
    upload_buffer: usize,
    receive_buffer: usize,
    response_code: i64,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            settings: ClientSettings::default(),
            client: None,
            url: String::new(),
            method: RequestMethod::Get,
            user_agent: String::new(),
            referer: None,
            header_lines: Vec::new(),
            body: RequestBody::None,
            upload_size: None,
            upload_buffer: 64 * 1024,
            receive_buffer: 32 * 1024,
            response_code: 0,
        }
    }

    fn client(&mut self) -> Result<Client, TransportError> {
        if let Some((built_with, client)) = &self.client {
            if *built_with == self.settings {
                return Ok(client.clone());
            }
        }
        debug!(settings = ?self.settings, "building HTTP client");
        let client = self.settings.build()?;
        self.client = Some((self.settings.clone(), client.clone()));
        Ok(client)
    }

    /// Header map for the next request. The configured user agent and referer
    /// go in first so a header line naming them replaces or removes them.
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            if !self.user_agent.is_empty() {
                headers.insert(USER_AGENT, agent);
            }
        }
        if let Some(referer) = self.referer.as_deref().and_then(|r| HeaderValue::from_str(r).ok()) {
            headers.insert(REFERER, referer);
        }

        // names already claimed by a header line
        let mut claimed = HashSet::new();
        for line in &self.header_lines {
            let (name, value) = match parse_header_line(line) {
                Some(HeaderDirective::Set { name, value }) => (name, HeaderValue::from_str(value)),
                Some(HeaderDirective::Empty { name }) => (name, Ok(HeaderValue::from_static(""))),
                Some(HeaderDirective::Remove { name }) => {
                    if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                        headers.remove(&name);
                        claimed.insert(name);
                    }
                    continue;
                }
                None => {
                    debug!(line = %line, "skipping malformed header line");
                    continue;
                }
            };
            match (HeaderName::from_bytes(name.as_bytes()), value) {
                (Ok(name), Ok(value)) => {
                    if claimed.insert(name.clone()) {
                        headers.remove(&name);
                    }
                    headers.append(name, value);
                }
                _ => warn!(line = %line, "dropping invalid request header"),
            }
        }
        headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.header_lines.iter().any(|line| {
            matches!(
                parse_header_line(line),
                Some(HeaderDirective::Set { name: n, .. }) if n.eq_ignore_ascii_case(name)
            )
        })
    }

    fn request(&mut self) -> Result<RequestBuilder, TransportError> {
        let client = self.client()?;
        let method = Method::from_bytes(self.method.as_str().as_bytes()).map_err(|e| {
            TransportError::new(TransportErrorKind::Other, format!("invalid method: {e}"))
        })?;
        Ok(client.request(method, self.url.as_str()).headers(self.request_headers()))
    }

    fn receive(&mut self, mut response: Response, io: Received<'_>) -> Result<(), TransportError> {
        self.response_code = i64::from(response.status().as_u16());

        let header_text = header_text(&response);
        if io.headers.write(header_text.as_bytes()) != header_text.len() {
            return Err(write_error());
        }

        let total = response.content_length().unwrap_or(0);
        let mut buf = vec![0u8; self.receive_buffer];
        let mut received = 0u64;
        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| TransportError::new(TransportErrorKind::RecvError, e.to_string()))?;
            if n == 0 {
                return Ok(());
            }
            if io.body.write(&buf[..n]) != n {
                return Err(write_error());
            }
            received += n as u64;
            if io.progress.on_progress(Progress::download(total, received)) == ProgressControl::Abort {
                return Err(TransportError::aborted());
            }
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn configure(&mut self, option: TransportOption) -> Result<(), TransportError> {
        match option {
            TransportOption::Url(url) => self.url = url,
            TransportOption::Method(method) => self.method = method,
            TransportOption::UserAgent(agent) => self.user_agent = agent,
            TransportOption::Referer(referer) => {
                self.referer = (!referer.is_empty()).then_some(referer);
            }
            TransportOption::Headers(lines) => self.header_lines = lines,
            TransportOption::Proxy { host, port, kind } => {
                self.settings.proxy = Some((host, port, kind));
            }
            TransportOption::ProxyCredentials(credentials) => {
                self.settings.proxy_credentials = credentials;
            }
            TransportOption::NoProxy(hosts) => self.settings.no_proxy = Some(hosts),
            TransportOption::CaBundle(path) => self.settings.ca_bundle = Some(path),
            TransportOption::UploadBufferSize(size) => self.upload_buffer = size.max(1),
            TransportOption::ReceiveBufferSize(size) => self.receive_buffer = size.max(1),
            TransportOption::UploadSize(size) => self.upload_size = size,
            TransportOption::Body(body) => self.body = body,
            TransportOption::FollowRedirects(on) => self.settings.follow_redirects = on,
            TransportOption::AutoReferer(on) => self.settings.auto_referer = on,
            TransportOption::VerifyPeer(on) => self.settings.verify_peer = on,
            TransportOption::VerifyHost(on) => self.settings.verify_host = on,
            TransportOption::AcceptEncoding(encoding) => self.settings.accept_encoding = encoding,
            TransportOption::CookieEngine(on) => self.settings.cookies = on,
            TransportOption::Raw { key, value } => {
                warn!(key, ?value, "ignoring unsupported transport option");
            }
        }
        Ok(())
    }

    fn perform(&mut self, io: TransferIo<'_>) -> Result<(), TransportError> {
        self.response_code = 0;
        let TransferIo {
            upload,
            body,
            headers,
            progress,
        } = io;

        let request = self.request()?;
        let response = match self.body.clone() {
            RequestBody::None => request.send().map_err(|e| map_error(&e))?,
            RequestBody::Fields(data) => {
                let request = if self.has_header("content-type") {
                    request
                } else {
                    request.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                };
                let size = data.len() as u64;
                let mut reader = Cursor::new(data);
                send_streamed(request, &mut reader, size, self.upload_buffer, &mut *progress)?
            }
            RequestBody::Multipart(parts) => {
                let (form, size) = multipart_form(&parts)?;
                let request = if self.has_header("content-type") {
                    request
                } else {
                    let value = format!("multipart/form-data; boundary={}", form.boundary());
                    request.header(CONTENT_TYPE, value)
                };
                let mut reader = form.into_reader();
                send_streamed(request, &mut reader, size, self.upload_buffer, &mut *progress)?
            }
            RequestBody::Streamed { size } => {
                let upload = upload.ok_or_else(|| {
                    TransportError::new(TransportErrorKind::ReadError, "no upload stream supplied")
                })?;
                let size = self.upload_size.unwrap_or(size);
                let mut reader = StreamReader(upload);
                send_streamed(request, &mut reader, size, self.upload_buffer, &mut *progress)?
            }
        };

        self.receive(
            response,
            Received {
                body,
                headers,
                progress,
            },
        )
    }

    fn response_code(&self) -> i64 {
        self.response_code
    }
}

/// Response side of [`TransferIo`].
struct Received<'a> {
    body: &'a mut dyn BodySink,
    headers: &'a mut dyn BodySink,
    progress: &'a mut (dyn ProgressObserver + Send),
}

/// Multipart form and its encoded length.
///
/// File parts are sized from metadata. The length of everything else comes from
/// encoding a copy of the form whose file parts are empty; the boundary has a
/// fixed width so both encodings differ only by the file contents.
fn multipart_form(parts: &[FormPart]) -> Result<(Form, u64), TransportError> {
    let mut form = Form::new();
    let mut skeleton = Form::new();
    let mut file_bytes = 0u64;
    for part in parts {
        match part {
            FormPart::Text { name, value } => {
                form = form.text(name.clone(), value.clone());
                skeleton = skeleton.text(name.clone(), value.clone());
            }
            FormPart::File {
                name,
                path,
                display_name,
                content_type,
            } => {
                let file = fs::File::open(path).map_err(|e| {
                    TransportError::new(
                        TransportErrorKind::FileCouldntRead,
                        format!("couldn't open file \"{}\": {e}", path.display()),
                    )
                })?;
                let len = file.metadata().map(|m| m.len()).map_err(|e| {
                    TransportError::new(TransportErrorKind::FileCouldntRead, e.to_string())
                })?;
                let file_name = if display_name.is_empty() {
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                } else {
                    display_name.clone()
                };
                let mime = if content_type.is_empty() {
                    DEFAULT_PART_TYPE
                } else {
                    content_type.as_str()
                };

                let contents = file_part(Part::reader_with_length(file, len), &file_name, mime)?;
                let empty = file_part(Part::bytes(Vec::new()), &file_name, mime)?;
                form = form.part(name.clone(), contents);
                skeleton = skeleton.part(name.clone(), empty);
                file_bytes += len;
            }
        }
    }

    let mut encoded = skeleton.into_reader();
    let framing = io::copy(&mut encoded, &mut io::sink())
        .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
    Ok((form, framing + file_bytes))
}

fn file_part(part: Part, file_name: &str, mime: &str) -> Result<Part, TransportError> {
    let part = if file_name.is_empty() {
        part
    } else {
        part.file_name(file_name.to_string())
    };
    part.mime_str(mime)
        .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))
}

/// [`UploadStream`] as an [`io::Read`] for the pump.
struct StreamReader<'a>(&'a mut (dyn UploadStream + Send));

impl Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// How the upload pump ended.
#[derive(Debug)]
enum PumpEnd {
    Finished,
    /// The connection stopped taking data before the body ended.
    Stopped,
    Aborted,
    ReadFailed(String),
}

/// Send `request` with a body pulled from `upload` on a pump thread, which
/// reports upload progress and stops on abort.
fn send_streamed(
    request: RequestBuilder,
    upload: &mut (dyn Read + Send),
    size: u64,
    chunk: usize,
    progress: &mut (dyn ProgressObserver + Send),
) -> Result<Response, TransportError> {
    let (tx, rx) = mpsc::sync_channel(PUMP_DEPTH);
    let request = request.body(Body::sized(ChannelReader::new(rx), size));
    let stop = AtomicBool::new(false);

    let (sent, pumped) = thread::scope(|scope| {
        let pump = scope.spawn(|| pump_upload(upload, size, chunk, tx, &stop, progress));
        let sent = request.send();
        stop.store(true, Ordering::Release);
        let pumped = pump
            .join()
            .unwrap_or_else(|_| PumpEnd::ReadFailed("upload pump panicked".to_string()));
        (sent, pumped)
    });
    debug!(?pumped, "upload pump finished");

    match (sent, pumped) {
        (_, PumpEnd::Aborted) => Err(TransportError::aborted()),
        (_, PumpEnd::ReadFailed(detail)) => {
            Err(TransportError::new(TransportErrorKind::ReadError, detail))
        }
        (Err(e), _) => Err(map_error(&e)),
        (Ok(response), PumpEnd::Finished | PumpEnd::Stopped) => Ok(response),
    }
}

fn pump_upload(
    upload: &mut (dyn Read + Send),
    size: u64,
    chunk: usize,
    tx: SyncSender<io::Result<Vec<u8>>>,
    stop: &AtomicBool,
    progress: &mut (dyn ProgressObserver + Send),
) -> PumpEnd {
    let mut buf = vec![0u8; chunk];
    let mut sent = 0u64;
    loop {
        let n = match upload.read(&mut buf) {
            Ok(0) => return PumpEnd::Finished,
            Ok(n) => n,
            Err(e) => {
                let detail = e.to_string();
                let _ = tx.try_send(Err(e));
                return PumpEnd::ReadFailed(detail);
            }
        };

        let mut pending = buf[..n].to_vec();
        loop {
            match tx.try_send(Ok(pending)) {
                Ok(()) => break,
                Err(TrySendError::Full(Ok(data))) => {
                    if stop.load(Ordering::Acquire) {
                        return PumpEnd::Stopped;
                    }
                    pending = data;
                    thread::sleep(PUMP_BACKOFF);
                }
                Err(TrySendError::Full(Err(_)) | TrySendError::Disconnected(_)) => {
                    return PumpEnd::Stopped;
                }
            }
        }

        sent += n as u64;
        if progress.on_progress(Progress::upload(size, sent)) == ProgressControl::Abort {
            let _ = tx.try_send(Err(io::Error::other("aborted by progress callback")));
            return PumpEnd::Aborted;
        }
    }
}

/// Request body fed by the upload pump.
struct ChannelReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    current: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            current: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.current.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Status line and headers of the final response, as they came off the wire.
fn header_text(response: &Response) -> String {
    let mut text = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        text.push_str(name.as_str());
        text.push_str(": ");
        text.push_str(&String::from_utf8_lossy(value.as_bytes()));
        text.push_str("\r\n");
    }
    text.push_str("\r\n");
    text
}

fn map_error(e: &::reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        TransportErrorKind::OperationTimedOut
    } else if e.is_redirect() {
        TransportErrorKind::TooManyRedirects
    } else if e.is_builder() {
        TransportErrorKind::UrlMalformat
    } else if e.is_connect() {
        TransportErrorKind::CouldntConnect
    } else if e.is_body() || e.is_request() {
        TransportErrorKind::SendError
    } else if e.is_decode() {
        TransportErrorKind::RecvError
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, error_chain(e))
}

fn error_chain(e: &dyn StdError) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn write_error() -> TransportError {
    TransportError::new(
        TransportErrorKind::WriteError,
        "Failure writing output to destination",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::BufferSource;

    fn transport_with_headers(lines: &[&str]) -> ReqwestTransport {
        let mut transport = ReqwestTransport::new();
        transport
            .configure(TransportOption::UserAgent("Mozilla/5.0".into()))
            .unwrap();
        transport
            .configure(TransportOption::Referer("http://origin.test/".into()))
            .unwrap();
        transport
            .configure(TransportOption::Headers(
                lines.iter().map(|l| l.to_string()).collect(),
            ))
            .unwrap();
        transport
    }

    #[test]
    fn test_channel_reader_spans_chunks() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(Ok(b"abc".to_vec())).unwrap();
        tx.send(Ok(b"defg".to_vec())).unwrap();
        drop(tx);

        let mut reader = ChannelReader::new(rx);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdefg");
    }

    #[test]
    fn test_channel_reader_surfaces_errors() {
        let (tx, rx) = mpsc::sync_channel(1);
        tx.send(Err(io::Error::other("boom"))).unwrap();

        let mut reader = ChannelReader::new(rx);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_pump_reports_progress_and_finishes() {
        let mut source = BufferSource::new(b"0123456789".to_vec(), None);
        let (tx, rx) = mpsc::sync_channel(16);
        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();
        let mut progress = |p: Progress| {
            seen.push(p.upload_now);
            ProgressControl::Continue
        };

        let mut reader = StreamReader(&mut source);
        let end = pump_upload(&mut reader, 10, 4, tx, &stop, &mut progress);
        assert!(matches!(end, PumpEnd::Finished));
        assert_eq!(seen, vec![4, 8, 10]);

        let mut out = Vec::new();
        ChannelReader::new(rx).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
    }

    #[test]
    fn test_pump_abort() {
        let mut source = Cursor::new(vec![7u8; 32]);
        let (tx, rx) = mpsc::sync_channel(16);
        let stop = AtomicBool::new(false);
        let mut progress = |_: Progress| ProgressControl::Abort;

        let end = pump_upload(&mut source, 32, 8, tx, &stop, &mut progress);
        assert!(matches!(end, PumpEnd::Aborted));

        let mut out = Vec::new();
        assert!(ChannelReader::new(rx).read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_pump_stops_when_connection_stalls() {
        let mut source = Cursor::new(vec![1u8; 64]);
        let (tx, _rx) = mpsc::sync_channel(1);
        let stop = AtomicBool::new(true);
        let mut progress = |_: Progress| ProgressControl::Continue;

        let end = pump_upload(&mut source, 64, 8, tx, &stop, &mut progress);
        assert!(matches!(end, PumpEnd::Stopped));
    }

    #[test]
    fn test_header_lines_become_request_headers() {
        let transport = transport_with_headers(&["X-Test: 1", "X-Empty;", "Expect: "]);

        let headers = transport.request_headers();
        assert_eq!(headers.get("x-test").unwrap(), "1");
        assert_eq!(headers.get("x-empty").unwrap(), "");
        assert!(headers.get("expect").is_none());
        assert_eq!(headers.get(USER_AGENT).unwrap(), "Mozilla/5.0");
        assert_eq!(headers.get(REFERER).unwrap(), "http://origin.test/");
    }

    #[test]
    fn test_header_line_replaces_default() {
        let transport = transport_with_headers(&["User-Agent: custom"]);

        let headers = transport.request_headers();
        let agents: Vec<_> = headers.get_all(USER_AGENT).iter().collect();
        assert_eq!(agents, vec!["custom"]);
    }

    #[test]
    fn test_removal_drops_defaults() {
        let transport = transport_with_headers(&["User-Agent: ", "referer: "]);

        let headers = transport.request_headers();
        assert!(headers.get(USER_AGENT).is_none());
        assert!(headers.get(REFERER).is_none());
    }

    #[test]
    fn test_empty_value_replaces_default() {
        let transport = transport_with_headers(&["User-Agent;"]);

        let headers = transport.request_headers();
        let agents: Vec<_> = headers.get_all(USER_AGENT).iter().collect();
        assert_eq!(agents, vec![""]);
    }

    #[test]
    fn test_repeated_header_lines_are_all_sent() {
        let transport = transport_with_headers(&["Accept: text/html", "Accept: text/plain"]);

        let headers = transport.request_headers();
        let values: Vec<_> = headers.get_all("accept").iter().collect();
        assert_eq!(values, vec!["text/html", "text/plain"]);
    }

    #[test]
    fn test_has_header() {
        let transport = transport_with_headers(&["Content-Type: text/plain", "X-Content-Type: a"]);
        assert!(transport.has_header("content-type"));
        assert!(!transport.has_header("x-other"));

        let transport = transport_with_headers(&["Content-Type;", "Content-Length: "]);
        assert!(!transport.has_header("content-type"));
        assert!(!transport.has_header("content-length"));
    }

    #[test]
    fn test_multipart_length_matches_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, vec![5u8; 3000]).unwrap();

        let parts = vec![
            FormPart::Text {
                name: "field".into(),
                value: "value".into(),
            },
            FormPart::File {
                name: "upload".into(),
                path: path.clone(),
                display_name: String::new(),
                content_type: String::new(),
            },
            FormPart::File {
                name: "named".into(),
                path,
                display_name: "report \"final\".txt".into(),
                content_type: "text/plain".into(),
            },
        ];

        let (form, size) = multipart_form(&parts).unwrap();
        let mut encoded = Vec::new();
        form.into_reader().read_to_end(&mut encoded).unwrap();

        assert_eq!(encoded.len() as u64, size);
        let text = String::from_utf8_lossy(&encoded);
        assert!(text.contains("filename=\"data.bin\""));
        assert!(text.contains("Content-Type: application/octet-stream"));
        assert!(text.contains("Content-Type: text/plain"));
    }

    #[test]
    fn test_multipart_missing_file() {
        let parts = vec![FormPart::File {
            name: "upload".into(),
            path: "/nonexistent/pulith/upload.bin".into(),
            display_name: String::new(),
            content_type: String::new(),
        }];

        let err = multipart_form(&parts).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::FileCouldntRead);
    }

    #[test]
    fn test_settings_change_rebuilds_client() {
        let mut transport = ReqwestTransport::new();
        transport.client().unwrap();
        let first = transport.client.as_ref().map(|(s, _)| s.clone());

        transport
            .configure(TransportOption::FollowRedirects(false))
            .unwrap();
        transport.client().unwrap();
        let second = transport.client.as_ref().map(|(s, _)| s.clone());

        assert_ne!(first, second);
        assert!(!second.unwrap().follow_redirects);
    }
}
