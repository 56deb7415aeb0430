// Stream-mode synchronization against a local stub panel that serves the
// area list over plain HTTP and state updates over a WebSocket.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use inception_core::{
    AreaSelector, BridgeConfig, SecuritySystem, SemanticState, StateSink, SyncMode,
};

const WAIT: Duration = Duration::from_secs(5);

// ── Stub panel ──────────────────────────────────────────────────────

/// First stream connection: one update for area 3, then a close frame.
/// Every later connection: a second update, then stays open.
async fn start_panel(
    connections: Arc<AtomicUsize>,
    subscriptions: mpsc::UnboundedSender<serde_json::Value>,
) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(
                stream,
                Arc::clone(&connections),
                subscriptions.clone(),
            ));
        }
    });
    base
}

async fn serve(
    stream: TcpStream,
    connections: Arc<AtomicUsize>,
    subscriptions: mpsc::UnboundedSender<serde_json::Value>,
) {
    let Some(line) = request_line(&stream).await else {
        return;
    };
    if !line.contains("/updates/stream") {
        let areas = json!([
            {"ID": 7, "Name": "Home", "State": 0x800},
            {"ID": 3, "Name": "Office", "State": 0x800}
        ]);
        answer_json(stream, &areas.to_string()).await;
        return;
    }

    let n = connections.fetch_add(1, Ordering::SeqCst) + 1;
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    if let Some(Ok(Message::Text(text))) = ws.next().await {
        let _ = subscriptions.send(serde_json::from_str(text.as_str()).unwrap());
    }

    let (update_time, state) = if n == 1 { (500, 0x400) } else { (600, 0x200) };
    let update = json!({
        "ID": "AreaStateRequest",
        "Result": {
            "updateTime": update_time,
            "stateData": [{"ID": 3, "stateValue": state}]
        }
    });
    if ws.send(Message::text(update.to_string())).await.is_err() {
        return;
    }
    if n == 1 {
        let _ = ws.close(None).await;
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

/// Drain a bodiless HTTP/1.1 request and answer it with a JSON body.
async fn answer_json(mut stream: TcpStream, body: &str) {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        data.extend_from_slice(&chunk[..n]);
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn subscription_cursor(subscription: &serde_json::Value) -> &str {
    subscription[0]["InputData"]["timeSinceUpdate"]
        .as_str()
        .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_reconnects_after_close() {
    let connections = Arc::new(AtomicUsize::new(0));
    let (sub_tx, mut sub_rx) = mpsc::unbounded_channel();
    let base = start_panel(Arc::clone(&connections), sub_tx).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn StateSink> = Arc::new(move |state: SemanticState| {
        let _ = tx.send(state);
    });

    let cfg = BridgeConfig {
        sync_mode: SyncMode::Stream,
        poll_interval: Duration::from_millis(20),
        ..BridgeConfig::new(
            base,
            SecretString::from("panel-token".to_owned()),
            AreaSelector::Name("Office".into()),
        )
    };
    let system = SecuritySystem::new(cfg, sink).unwrap();
    system.connect().await.unwrap();

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, SemanticState::NightArmed);

    // The panel closed the first stream; a fresh one starts from cursor 0.
    let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(second, SemanticState::StayArmed);
    assert_eq!(connections.load(Ordering::SeqCst), 2);

    let cursors: Vec<String> = [sub_rx.recv().await.unwrap(), sub_rx.recv().await.unwrap()]
        .iter()
        .map(|s| subscription_cursor(s).to_owned())
        .collect();
    assert_eq!(cursors, vec!["0".to_owned(), "0".to_owned()]);

    system.shutdown().await;
}
