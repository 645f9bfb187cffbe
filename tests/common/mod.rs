// Local HTTP servers used by the integration tests

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub raw_body: Vec<u8>,
    pub parts: Vec<ReceivedPart>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    requests: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

/// axum server that answers every `POST /upload` with a fixed status and
/// records what it received, parsed with axum's multipart extractor.
pub struct MockServer {
    pub base_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(status: u16) -> Self {
        let state = MockState {
            status: StatusCode::from_u16(status).expect("valid status"),
            requests: Arc::new(AtomicUsize::new(0)),
            uploads: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/upload", post(handle_upload))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().expect("uploads lock").clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_upload(State(state): State<MockState>, request: Request) -> StatusCode {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let raw_body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header(AUTHORIZATION);
    let content_type = header(CONTENT_TYPE);
    let path = parts.uri.path().to_string();

    let mut received = Vec::new();
    let rebuilt = Request::from_parts(parts, Body::from(raw_body.clone()));
    if let Ok(mut multipart) = Multipart::from_request(rebuilt, &()).await {
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let part_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            received.push(ReceivedPart {
                name,
                file_name,
                content_type: part_type,
                bytes,
            });
        }
    }

    state
        .uploads
        .lock()
        .expect("uploads lock")
        .push(ReceivedUpload {
            path,
            authorization,
            content_type,
            raw_body: raw_body.to_vec(),
            parts: received,
        });

    state.status
}

/// Raw TCP server that answers one connection per scripted status and then
/// closes its listener, so any later connection is refused.
pub struct ScriptedServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    pub async fn start(statuses: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));

        let handle = tokio::spawn(async move {
            for status in statuses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { base_url, handle }
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accepts connections and never answers them.
pub struct HangingServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl HangingServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));

        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        Self { base_url, handle }
    }
}

impl Drop for HangingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Base URL of a port nothing is listening on.
pub async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }
}
