//! [`Server`] – setup surface, accept loop and HTTP view serving.
//!
//! * Plain HTTP `GET` for a registered view path → 200 with the view's HTML.
//! * WebSocket upgrade on [`WS_PATH`] → a new [`Session`] with its own
//!   outbound queue.
//! * Anything else → 404.  With no views registered, `/` answers
//!   `Gasp Server Online`.
//!
//! Setup (`add_view`, `add_event_handler`) happens on `&mut Server`; binding
//! freezes the router into an `Arc` shared read-only by every session.
//!
//! The request line and headers are read in full (up to 8 KiB) before the
//! request is classified, so header order and TCP segmentation do not matter.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use gasp_middleware::{
    ClientEvent, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY, OutboundQueue, Router, SharedStore,
};
use gasp_types::{GaspError, WS_PATH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing::{debug, error, info};

use crate::errors::ErrorSink;
use crate::session::Session;

/// Socket used when the caller does not supply one.
pub const DEFAULT_SOCKET: &str = "127.0.0.1:8800";

const DEFAULT_GREETING: &str = "Gasp Server Online";

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 8 * 1024;

// ---------------------------------------------------------------------------
// Socket / path validation
// ---------------------------------------------------------------------------

/// Accepts `<ip>:<port>`, `[<ipv6>]:<port>`, `localhost:<port>` and
/// `<fqdn>:<port>` where the hostname has at least two labels.
pub fn validate_socket(socket: &str) -> Result<(), GaspError> {
    let invalid = || GaspError::InvalidSocket(socket.to_string());

    if socket.parse::<SocketAddr>().is_ok() {
        return Ok(());
    }
    let (host, port) = socket.rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;

    if host.parse::<IpAddr>().is_ok() || host == "localhost" || is_hostname(host) {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn is_hostname(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        // the top-level label is never all digits
        && labels
            .last()
            .is_some_and(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
}

/// Trim, default to `/` and ensure a leading slash.
fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A gasp server under construction.
///
/// # Example
///
/// ```rust,no_run
/// use gasp_server::Server;
/// use gasp_types::{LabelState, Property};
///
/// #[tokio::main]
/// async fn main() -> Result<(), gasp_types::GaspError> {
///     let mut server = Server::new("127.0.0.1:8800")?;
///     server
///         .add_view("/", "<html>…</html>")?
///         .add_event_handler("/", "gbutton0", "click", |evt| {
///             let mut label = LabelState::new("glabel0");
///             label.control.text = "clicked".to_string();
///             if let Some(outbox) = evt.outbox() {
///                 outbox.update_label(&label, &[Property::Text]);
///             }
///         })?;
///     server.run().await
/// }
/// ```
pub struct Server {
    socket: String,
    views: HashMap<String, String>,
    router: Router,
    queue_capacity: usize,
    store: SharedStore,
    errors: ErrorSink,
    error_rx: Option<mpsc::Receiver<GaspError>>,
}

impl Server {
    /// Create a server that will listen on `socket`.
    ///
    /// # Errors
    ///
    /// Returns [`GaspError::InvalidSocket`] when `socket` is not
    /// `<host>:<port>`.
    pub fn new(socket: impl Into<String>) -> Result<Self, GaspError> {
        let socket = socket.into().trim().to_string();
        validate_socket(&socket)?;
        let (errors, error_rx) = ErrorSink::channel();
        Ok(Self {
            socket,
            views: HashMap::new(),
            router: Router::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            store: SharedStore::new(),
            errors,
            error_rx: Some(error_rx),
        })
    }

    /// Size of each session's outbound queue (builder-style), clamped to
    /// `1..=MAX_QUEUE_CAPACITY`.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
        self
    }

    pub fn socket(&self) -> &str {
        &self.socket
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Serve `html` verbatim at `path`.
    ///
    /// # Errors
    ///
    /// [`GaspError::ReservedPath`] for [`WS_PATH`];
    /// [`GaspError::DuplicatePath`] when `path` already has a view.
    pub fn add_view(
        &mut self,
        path: &str,
        html: impl Into<String>,
    ) -> Result<&mut Self, GaspError> {
        let path = normalize_path(path);
        if path == WS_PATH {
            return Err(GaspError::ReservedPath);
        }
        if self.views.contains_key(&path) {
            return Err(GaspError::DuplicatePath(path));
        }
        debug!(%path, "view registered");
        self.views.insert(path, html.into());
        Ok(self)
    }

    /// Register `handler` for `(view, element_id, event_type)`.  `view` and
    /// `element_id` may be `*`.
    pub fn add_event_handler<F>(
        &mut self,
        view: &str,
        element_id: &str,
        event_type: &str,
        handler: F,
    ) -> Result<&mut Self, GaspError>
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.router.register(view, element_id, event_type, handler)?;
        Ok(self)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Take the receiving end of the error sink.  `None` after the first call.
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<GaspError>> {
        self.error_rx.take()
    }

    /// Bind the listener and freeze the setup.
    ///
    /// # Errors
    ///
    /// Returns [`GaspError::Bind`] if the TCP listener cannot bind.
    pub async fn bind(self) -> Result<BoundServer, GaspError> {
        let listener = TcpListener::bind(&self.socket)
            .await
            .map_err(|e| GaspError::Bind {
                addr: self.socket.clone(),
                details: e.to_string(),
            })?;

        info!(
            socket = %self.socket,
            views = self.views.len(),
            handlers = self.router.handler_count(),
            "gasp server listening"
        );

        Ok(BoundServer {
            listener,
            shared: Arc::new(Shared {
                views: self.views,
                router: Arc::new(self.router),
                queue_capacity: self.queue_capacity,
                store: self.store,
                errors: self.errors,
            }),
        })
    }

    /// Bind and serve until the process ends.
    pub async fn run(self) -> Result<(), GaspError> {
        self.bind().await?.serve().await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BoundServer
// ---------------------------------------------------------------------------

/// What every connection task needs, frozen at bind time.
struct Shared {
    views: HashMap<String, String>,
    router: Arc<Router>,
    queue_capacity: usize,
    store: SharedStore,
    errors: ErrorSink,
}

/// A listening server.
pub struct BoundServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl BoundServer {
    pub fn local_addr(&self) -> Result<SocketAddr, GaspError> {
        self.listener
            .local_addr()
            .map_err(|e| GaspError::Io(e.to_string()))
    }

    /// Accept connections forever.
    pub async fn serve(self) {
        self.serve_until(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("gasp server stopped accepting connections");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let shared = Arc::clone(&self.shared);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, &shared).await {
                                shared.errors.report(e);
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

/// Request line and headers of one HTTP request.
struct RequestHead {
    path: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    fn parse(raw: &str) -> Self {
        let mut lines = raw.split("\r\n");
        let path = request_path(lines.next().unwrap_or_default()).to_string();
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        Self { path, headers }
    }

    /// First value of header `name` (lowercase).
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_websocket_upgrade(&self) -> bool {
        self.header("upgrade")
            .is_some_and(|v| v.to_ascii_lowercase().contains("websocket"))
    }
}

enum Incoming {
    Head(RequestHead),
    TooLarge,
    Closed,
}

/// Read through the blank line that ends the headers.
async fn read_head(stream: &mut TcpStream) -> std::io::Result<Incoming> {
    let mut raw = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = RequestHead::parse(&String::from_utf8_lossy(&raw[..end]));
            return Ok(Incoming::Head(head));
        }
        if raw.len() > MAX_HEAD_BYTES {
            return Ok(Incoming::TooLarge);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Incoming::Closed);
        }
        raw.extend_from_slice(&chunk[..n]);
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    shared: &Shared,
) -> Result<(), GaspError> {
    let incoming = read_head(&mut stream)
        .await
        .map_err(|e| GaspError::Io(format!("read error from {peer}: {e}")))?;

    let head = match incoming {
        Incoming::Head(head) => head,
        Incoming::TooLarge => {
            debug!(%peer, "request head too large");
            return write_response(
                &mut stream,
                "431 Request Header Fields Too Large",
                "text/plain",
                "request header fields too large",
            )
            .await;
        }
        Incoming::Closed => {
            debug!(%peer, "connection closed before the request was complete");
            return Ok(());
        }
    };

    if head.is_websocket_upgrade() {
        if head.path == WS_PATH {
            return handle_ws(stream, peer, &head, shared).await;
        }
        debug!(%peer, path = %head.path, "upgrade refused on non-channel path");
        return write_response(&mut stream, "404 Not Found", "text/plain", "404 page not found").await;
    }

    match shared.views.get(&head.path) {
        Some(html) => {
            write_response(&mut stream, "200 OK", "text/html; charset=utf-8", html).await
        }
        None if shared.views.is_empty() && head.path == "/" => {
            write_response(&mut stream, "200 OK", "text/plain; charset=utf-8", DEFAULT_GREETING)
                .await
        }
        None => {
            debug!(%peer, path = %head.path, "no view at path");
            write_response(&mut stream, "404 Not Found", "text/plain", "404 page not found").await
        }
    }
}

/// Path of the request target, without any query string.
fn request_path(request_line: &str) -> &str {
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    target.split(['?', '#']).next().unwrap_or(target)
}

/// The `101` reply completing the handshake for `key`.
fn switching_protocols(key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        derive_accept_key(key.as_bytes())
    )
}

async fn write_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &str,
) -> Result<(), GaspError> {
    let response = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len(),
    );
    stream
        .write_all(response.as_bytes())
        .await
        .map_err(|e| GaspError::Io(format!("HTTP write error: {e}")))?;
    let _ = stream.shutdown().await;
    Ok(())
}

async fn handle_ws(
    mut stream: TcpStream,
    peer: SocketAddr,
    head: &RequestHead,
    shared: &Shared,
) -> Result<(), GaspError> {
    let Some(key) = head.header("sec-websocket-key") else {
        write_response(&mut stream, "400 Bad Request", "text/plain", "missing Sec-WebSocket-Key")
            .await?;
        return Err(GaspError::Handshake(format!("from {peer}: missing Sec-WebSocket-Key")));
    };
    if let Some(version) = head.header("sec-websocket-version").filter(|v| *v != "13") {
        write_response(&mut stream, "400 Bad Request", "text/plain", "unsupported WebSocket version")
            .await?;
        return Err(GaspError::Handshake(format!(
            "from {peer}: unsupported WebSocket version {version}"
        )));
    }

    stream
        .write_all(switching_protocols(key).as_bytes())
        .await
        .map_err(|e| GaspError::Handshake(format!("from {peer}: {e}")))?;

    let session = Session::new(
        Arc::clone(&shared.router),
        OutboundQueue::new(shared.queue_capacity),
        shared.errors.clone(),
        shared.store.clone(),
    )
    .with_peer(peer);

    let ws = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
    session.run(ws).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use gasp_types::{CheckboxState, LabelState, Property, ServerEvent, WS_INFO};
    use std::time::Duration;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    const WAIT: Duration = Duration::from_secs(2);

    // ── Socket validation ────────────────────────────────────────────────────

    #[test]
    fn accepts_ip_localhost_and_fqdn_sockets() {
        for ok in [
            "127.0.0.1:8800",
            "0.0.0.0:0",
            "[::1]:9000",
            "localhost:8080",
            "gasp.example.com:443",
            "my-host.lan:1",
        ] {
            assert!(validate_socket(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_sockets() {
        for bad in [
            "",
            "8800",
            "localhost",
            "localhost:",
            "localhost:99999",
            "127.0.0.1:port",
            "singlelabel:80",
            "-bad.example.com:80",
            "a..b:80",
            "999.1.1.1:80",
        ] {
            assert_eq!(
                validate_socket(bad),
                Err(GaspError::InvalidSocket(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn new_rejects_invalid_socket() {
        assert!(matches!(Server::new("nope"), Err(GaspError::InvalidSocket(_))));
    }

    // ── Setup ────────────────────────────────────────────────────────────────

    #[test]
    fn default_queue_capacity_and_override() {
        let server = Server::new(DEFAULT_SOCKET).unwrap();
        assert_eq!(server.queue_capacity(), gasp_middleware::DEFAULT_QUEUE_CAPACITY);
        assert_eq!(server.with_queue_capacity(16).queue_capacity(), 16);
    }

    #[test]
    fn queue_capacity_is_clamped() {
        let server = Server::new(DEFAULT_SOCKET).unwrap();
        let server = server.with_queue_capacity(usize::MAX);
        assert_eq!(server.queue_capacity(), MAX_QUEUE_CAPACITY);
        assert_eq!(server.with_queue_capacity(0).queue_capacity(), 1);
    }

    #[test]
    fn add_view_normalizes_and_rejects_duplicates() {
        let mut server = Server::new(DEFAULT_SOCKET).unwrap();
        server.add_view("form", "<p>form</p>").unwrap();
        assert_eq!(
            server.add_view("/form", "<p>again</p>").err(),
            Some(GaspError::DuplicatePath("/form".to_string()))
        );
        server.add_view("", "<p>root</p>").unwrap();
        assert!(matches!(server.add_view(" / ", "x"), Err(GaspError::DuplicatePath(_))));
    }

    #[test]
    fn add_view_rejects_channel_path() {
        let mut server = Server::new(DEFAULT_SOCKET).unwrap();
        assert_eq!(server.add_view("/gaspws", "x").err(), Some(GaspError::ReservedPath));
        assert_eq!(server.add_view("gaspws", "x").err(), Some(GaspError::ReservedPath));
    }

    #[test]
    fn add_event_handler_validates_event_type() {
        let mut server = Server::new(DEFAULT_SOCKET).unwrap();
        assert!(matches!(
            server.add_event_handler("*", "*", "", |_| {}),
            Err(GaspError::InvalidRoute(_))
        ));
        server
            .add_event_handler("/", "a", "click", |_| {})
            .unwrap()
            .add_event_handler("*", "*", "click", |_| {})
            .unwrap();
        assert_eq!(server.router().handler_count(), 2);
    }

    #[test]
    fn take_errors_only_once() {
        let mut server = Server::new(DEFAULT_SOCKET).unwrap();
        assert!(server.take_errors().is_some());
        assert!(server.take_errors().is_none());
    }

    #[test]
    fn request_path_strips_query() {
        assert_eq!(request_path("GET /form?x=1 HTTP/1.1"), "/form");
        assert_eq!(request_path("GET / HTTP/1.1"), "/");
        assert_eq!(request_path(""), "/");
    }

    #[test]
    fn request_head_headers_are_case_insensitive() {
        let head = RequestHead::parse(
            "GET /gaspws?v=1 HTTP/1.1\r\nHost: x\r\nUPGRADE: WebSocket\r\nsec-websocket-key: abc",
        );
        assert_eq!(head.path, "/gaspws");
        assert!(head.is_websocket_upgrade());
        assert_eq!(head.header("sec-websocket-key"), Some("abc"));
        assert_eq!(head.header("cookie"), None);
    }

    #[test]
    fn switching_protocols_derives_accept_key() {
        let reply = switching_protocols("dGhlIHNhbXBsZSBub25jZQ==");
        assert!(reply.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(reply.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(reply.ends_with("\r\n\r\n"));
    }

    // ── Loopback ─────────────────────────────────────────────────────────────

    async fn start(server: Server) -> SocketAddr {
        let bound = server.bind().await.unwrap();
        let addr = bound.local_addr().unwrap();
        tokio::spawn(bound.serve());
        addr
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        response
    }

    fn decode(msg: Message) -> ServerEvent {
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn bind_error_is_reported() {
        let first = Server::new("127.0.0.1:0").unwrap().bind().await.unwrap();
        let taken = first.local_addr().unwrap();
        let err = Server::new(taken.to_string()).unwrap().bind().await.err();
        assert!(matches!(err, Some(GaspError::Bind { .. })));
    }

    #[tokio::test]
    async fn greeting_without_views() {
        let addr = start(Server::new("127.0.0.1:0").unwrap()).await;
        let response = http_get(addr, "/").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("Gasp Server Online"));
        assert!(http_get(addr, "/elsewhere").await.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn serves_registered_views_verbatim() {
        let mut server = Server::new("127.0.0.1:0").unwrap();
        server.add_view("/form", "<h1>form</h1>").unwrap();
        let addr = start(server).await;

        let response = http_get(addr, "/form").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("text/html"));
        assert!(response.ends_with("<h1>form</h1>"));
        assert!(http_get(addr, "/").await.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn websocket_on_other_paths_is_refused() {
        let addr = start(Server::new("127.0.0.1:0").unwrap()).await;
        assert!(connect_async(format!("ws://{addr}/not-the-channel")).await.is_err());
    }

    #[tokio::test]
    async fn websocket_round_trip_over_loopback() {
        let mut server = Server::new("127.0.0.1:0").unwrap();
        server
            .add_event_handler("*", "gcheckbox0", "change", |evt| {
                let mut state = evt
                    .state
                    .get_checkbox("gcheckbox0")
                    .cloned()
                    .unwrap_or_else(|| CheckboxState::new("gcheckbox0"));
                state.is_checked = !state.is_checked;
                evt.outbox()
                    .unwrap()
                    .update_checkbox(&state, &[Property::IsChecked]);
            })
            .unwrap();
        let addr = start(server).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}{WS_PATH}")).await.unwrap();

        let greeting = tokio::time::timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(decode(greeting).event_type, WS_INFO);

        let raw = r#"{"view":"/","id":"gcheckbox0","type":"change","state":{"checkboxes":[{"id":"gcheckbox0","is_checked":false}]}}"#;
        ws.send(Message::Text(raw.into())).await.unwrap();

        let reply = tokio::time::timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        let reply = decode(reply);
        assert_eq!(reply.event_type, "checkbox_update");
        let state: CheckboxState = reply.state().unwrap().unwrap();
        assert!(state.is_checked);
    }

    #[tokio::test]
    async fn malformed_frame_lands_in_the_error_sink() {
        let mut server = Server::new("127.0.0.1:0").unwrap();
        let mut errors = server.take_errors().unwrap();
        let addr = start(server).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}{WS_PATH}")).await.unwrap();
        ws.send(Message::Text("garbage".into())).await.unwrap();

        let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap().unwrap();
        assert!(matches!(err, GaspError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn replies_reach_only_the_originating_client() {
        let mut server = Server::new("127.0.0.1:0").unwrap();
        server
            .add_event_handler("*", "glabel0", "click", |evt| {
                let who = evt.data_str("who").unwrap_or_default();
                let mut label = LabelState::new("glabel0");
                label.control.text = who.to_string();
                evt.outbox().unwrap().update_label(&label, &[Property::Text]);
            })
            .unwrap();
        let addr = start(server).await;

        let (mut a, _) = connect_async(format!("ws://{addr}{WS_PATH}")).await.unwrap();
        let (mut b, _) = connect_async(format!("ws://{addr}{WS_PATH}")).await.unwrap();
        for ws in [&mut a, &mut b] {
            let greeting = tokio::time::timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
            assert_eq!(decode(greeting).event_type, WS_INFO);
        }

        let raw = r#"{"view":"/","id":"glabel0","type":"click","data":{"who":"b"}}"#;
        b.send(Message::Text(raw.into())).await.unwrap();

        let reply = tokio::time::timeout(WAIT, b.next()).await.unwrap().unwrap().unwrap();
        let label: LabelState = decode(reply).state().unwrap().unwrap();
        assert_eq!(label.control.text, "b");

        let stray = tokio::time::timeout(Duration::from_millis(200), a.next()).await;
        assert!(stray.is_err(), "client a received {stray:?}");
    }

    /// Send `parts` with a pause between them and return the status line.
    async fn raw_handshake(addr: SocketAddr, parts: &[String]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for part in parts {
            stream.write_all(part.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let mut buf = vec![0u8; 512];
        let n = tokio::time::timeout(WAIT, stream.read(&mut buf)).await.unwrap().unwrap();
        let response = String::from_utf8_lossy(&buf[..n]).to_string();
        response.lines().next().unwrap_or_default().to_string()
    }

    const UPGRADE_HEADERS: &str = "Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    #[tokio::test]
    async fn upgrade_after_large_headers_is_accepted() {
        let addr = start(Server::new("127.0.0.1:0").unwrap()).await;
        let request = format!(
            "GET {WS_PATH} HTTP/1.1\r\nHost: {addr}\r\nCookie: session={}\r\n{UPGRADE_HEADERS}",
            "x".repeat(1200)
        );
        let status = raw_handshake(addr, &[request]).await;
        assert!(status.starts_with("HTTP/1.1 101"), "got {status}");
    }

    #[tokio::test]
    async fn upgrade_split_across_segments_is_accepted() {
        let addr = start(Server::new("127.0.0.1:0").unwrap()).await;
        let parts = [
            format!("GET {WS_PATH} HTTP/1.1\r\n"),
            format!("Host: {addr}\r\n{UPGRADE_HEADERS}"),
        ];
        let status = raw_handshake(addr, &parts).await;
        assert!(status.starts_with("HTTP/1.1 101"), "got {status}");
    }

    #[tokio::test]
    async fn upgrade_without_key_is_rejected() {
        let mut server = Server::new("127.0.0.1:0").unwrap();
        let mut errors = server.take_errors().unwrap();
        let addr = start(server).await;

        let request = format!("GET {WS_PATH} HTTP/1.1\r\nHost: {addr}\r\nUpgrade: websocket\r\n\r\n");
        let status = raw_handshake(addr, &[request]).await;
        assert!(status.starts_with("HTTP/1.1 400"), "got {status}");

        let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap().unwrap();
        assert!(matches!(err, GaspError::Handshake(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn serve_until_stops_accepting() {
        let bound = Server::new("127.0.0.1:0").unwrap().bind().await.unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(bound.serve_until(async {
            let _ = stop_rx.await;
        }));
        stop_tx.send(()).unwrap();
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    }
}
