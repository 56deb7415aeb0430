// Integration tests for the WebSocket update stream against a local stub
// panel that answers logins over plain HTTP and upgrades stream requests.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use inception_api::{
    ApiDialect, AreaId, AuthMethod, CredentialSource, CredentialTransport, Error, PanelClient,
    RawAreaState, TransportConfig,
};

const WAIT: Duration = Duration::from_secs(5);

// ── Stub panel ──────────────────────────────────────────────────────

#[derive(Clone)]
struct Shared {
    accepted: &'static str,
    frames: Vec<Message>,
    logins: Arc<AtomicUsize>,
    handshakes: Arc<AtomicUsize>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    subscriptions: mpsc::UnboundedSender<String>,
}

struct StubPanel {
    base: Url,
    logins: Arc<AtomicUsize>,
    handshakes: Arc<AtomicUsize>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    subscriptions: mpsc::UnboundedReceiver<String>,
}

impl StubPanel {
    /// Upgrades whose Authorization header equals `accepted` succeed and
    /// get `frames` once the subscription arrives; all others get 401.
    /// The first login hands out `first`, every later one `fresh`.
    async fn start(accepted: &'static str, frames: Vec<Message>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        let shared = Shared {
            accepted,
            frames,
            logins: Arc::new(AtomicUsize::new(0)),
            handshakes: Arc::new(AtomicUsize::new(0)),
            auth_headers: Arc::new(Mutex::new(Vec::new())),
            subscriptions: tx,
        };
        let panel = Self {
            base,
            logins: Arc::clone(&shared.logins),
            handshakes: Arc::clone(&shared.handshakes),
            auth_headers: Arc::clone(&shared.auth_headers),
            subscriptions: rx,
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, shared.clone()));
            }
        });
        panel
    }

    fn client(&self, auth: AuthMethod) -> PanelClient {
        PanelClient::new(&self.base, ApiDialect::V1, auth, &TransportConfig::default()).unwrap()
    }

    fn auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().unwrap().clone()
    }
}

async fn serve(stream: TcpStream, shared: Shared) {
    let Some(line) = request_line(&stream).await else {
        return;
    };

    if line.starts_with("POST ") {
        let n = shared.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let user_id = if n == 1 { "first" } else { "fresh" };
        let body = json!({
            "UserID": user_id,
            "Response": {"Result": "Success", "Message": "OK"}
        });
        answer_json(stream, &body.to_string()).await;
        return;
    }

    shared.handshakes.fetch_add(1, Ordering::SeqCst);
    let seen = Arc::clone(&shared.auth_headers);
    let accepted = shared.accepted;
    let check = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let auth = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let ok = auth == accepted;
        seen.lock().unwrap().push(auth);
        if ok {
            Ok(resp)
        } else {
            let mut reject = ErrorResponse::new(Some("unauthorized".into()));
            *reject.status_mut() = StatusCode::UNAUTHORIZED;
            Err(reject)
        }
    };

    let Ok(mut ws) = accept_hdr_async(stream, check).await else {
        return;
    };
    if let Some(Ok(Message::Text(text))) = ws.next().await {
        let _ = shared.subscriptions.send(text.as_str().to_owned());
    }
    for frame in shared.frames {
        if ws.send(frame).await.is_err() {
            return;
        }
    }
    while let Some(Ok(_)) = ws.next().await {}
}

/// The request line, read without consuming the stream.
async fn request_line(stream: &TcpStream) -> Option<String> {
    let mut buf = [0u8; 512];
    loop {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        if let Some(end) = buf[..n].windows(2).position(|w| w == b"\r\n") {
            return Some(String::from_utf8_lossy(&buf[..end]).into_owned());
        }
        if n == buf.len() {
            return None;
        }
        tokio::task::yield_now().await;
    }
}

/// Drain one HTTP/1.1 request and answer it with a JSON body.
async fn answer_json(mut stream: TcpStream, body: &str) {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        data.extend_from_slice(&chunk[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

// ── Helpers ─────────────────────────────────────────────────────────

fn token_auth() -> AuthMethod {
    AuthMethod::Token {
        token: SecretString::from("panel-token".to_owned()),
        transport: CredentialTransport::Bearer,
    }
}

fn login_auth() -> AuthMethod {
    AuthMethod::Login {
        username: "installer".into(),
        password: SecretString::from("hunter2".to_owned()),
        source: CredentialSource::default(),
        transport: CredentialTransport::Bearer,
    }
}

fn envelope(update_time: u64, id: &str, state: u32) -> Message {
    Message::text(
        json!({
            "ID": "AreaStateRequest",
            "Result": {
                "updateTime": update_time,
                "stateData": [{"ID": id, "stateValue": state}]
            }
        })
        .to_string(),
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_carries_credential_and_cursor() {
    let mut panel = StubPanel::start("Bearer panel-token", vec![envelope(1700, "a", 0x400)]).await;
    let client = panel.client(token_auth());

    let mut stream = client.open_update_stream(1699).await.unwrap();
    assert_eq!(panel.auth_headers(), vec!["Bearer panel-token".to_owned()]);

    let subscription = tokio::time::timeout(WAIT, panel.subscriptions.recv())
        .await
        .unwrap()
        .unwrap();
    let subscription: serde_json::Value = serde_json::from_str(&subscription).unwrap();
    assert_eq!(
        subscription,
        json!([{
            "ID": "AreaStateRequest",
            "RequestType": "AreaState",
            "InputData": {"stateType": "AreaState", "timeSinceUpdate": "1699"}
        }])
    );

    let batch = stream.next_batch().await.unwrap().unwrap();
    assert_eq!(batch.update_time, Some(1700));
    assert_eq!(
        batch.latest_for(&AreaId::from("a")).unwrap().state.raw(),
        Some(RawAreaState::Bitmask(0x400))
    );
    stream.close().await;
}

#[tokio::test]
async fn test_rejected_handshake_logs_in_exactly_once_more() {
    let panel = StubPanel::start("Bearer fresh", Vec::new()).await;
    let client = panel.client(login_auth());

    let stream = client.open_update_stream(0).await.unwrap();

    assert_eq!(panel.logins.load(Ordering::SeqCst), 2);
    assert_eq!(panel.handshakes.load(Ordering::SeqCst), 2);
    assert_eq!(
        panel.auth_headers(),
        vec!["Bearer first".to_owned(), "Bearer fresh".to_owned()]
    );
    assert!(client.session().is_valid());
    stream.close().await;
}

#[tokio::test]
async fn test_handshake_rejected_twice_is_unauthorized() {
    let panel = StubPanel::start("Bearer nobody", Vec::new()).await;
    let client = panel.client(login_auth());

    let err = client.open_update_stream(0).await.err().unwrap();

    assert!(matches!(err, Error::Unauthorized), "got {err:?}");
    assert_eq!(panel.logins.load(Ordering::SeqCst), 2);
    assert_eq!(panel.handshakes.load(Ordering::SeqCst), 2);
    assert!(!client.session().is_valid());
}

#[tokio::test]
async fn test_close_frame_ends_stream() {
    let close = Message::Close(Some(CloseFrame {
        code: CloseCode::Away,
        reason: "maintenance".into(),
    }));
    let panel = StubPanel::start("Bearer panel-token", vec![close]).await;
    let client = panel.client(token_auth());

    let mut stream = client.open_update_stream(0).await.unwrap();
    let err = tokio::time::timeout(WAIT, stream.next_batch())
        .await
        .unwrap()
        .unwrap_err();

    match err {
        Error::WebSocketClosed { code, ref reason } => {
            assert_eq!(code, 1001);
            assert_eq!(reason, "maintenance");
        }
        ref other => panic!("expected close, got {other:?}"),
    }
    assert!(err.is_transient());
}
