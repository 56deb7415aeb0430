//! WebSocket update stream.
//!
//! A persistent connection to the panel's `updates/stream` endpoint. The
//! live credential rides on the upgrade request; a 401 handshake triggers
//! one re-authentication, mirroring the REST retry rule. After the upgrade
//! the client sends the same area-state subscription the long-poll endpoint
//! takes, and every text frame afterwards carries an update batch.
//!
//! Reconnection is the caller's job: any error leaves the stream unusable
//! and the synchronizer opens a fresh one on its next cycle.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::Credential;
use crate::client::PanelClient;
use crate::error::{Error, preview};
use crate::models::{AreaUpdate, MonitorRequest, MonitorResponse, UpdateBatch};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── UpdateStream ─────────────────────────────────────────────────────

/// An open, subscribed update stream.
pub struct UpdateStream {
    socket: Socket,
    idle_timeout: Duration,
}

impl UpdateStream {
    /// Wait for the next update batch.
    ///
    /// Returns `Ok(None)` if nothing arrived within the long-poll timeout,
    /// so the caller gets a regular chance to observe cancellation.
    pub async fn next_batch(&mut self) -> Result<Option<UpdateBatch>, Error> {
        loop {
            let Ok(frame) = tokio::time::timeout(self.idle_timeout, self.socket.next()).await
            else {
                trace!("no stream frame within idle timeout");
                return Ok(None);
            };

            match frame {
                Some(Ok(Message::Text(text))) => return parse_frame(text.as_str()).map(Some),
                Some(Ok(Message::Binary(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes);
                    return parse_frame(&text).map(Some);
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (1005, String::new()),
                        |cf| (u16::from(cf.code), cf.reason.to_string()),
                    );
                    info!(code, reason = %reason, "update stream closed by panel");
                    return Err(Error::WebSocketClosed { code, reason });
                }
                Some(Ok(_)) => {
                    // Ping/Pong; tungstenite answers pings itself.
                    trace!("stream control frame");
                }
                Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                None => {
                    return Err(Error::WebSocketClosed {
                        code: 1006,
                        reason: "stream ended without close frame".into(),
                    });
                }
            }
        }
    }

    /// Send a close frame and drop the connection.
    pub async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(error = %e, "error closing update stream");
        }
    }
}

// ── Connecting ───────────────────────────────────────────────────────

impl PanelClient {
    /// Open the update stream and subscribe to area state changes newer
    /// than `cursor`.
    pub async fn open_update_stream(&self, cursor: u64) -> Result<UpdateStream, Error> {
        let path = self
            .dialect()
            .stream_path()
            .ok_or(Error::Unsupported("update stream"))?;
        let url = stream_url(self.base_url(), path)?;

        let credential = self.session().credential().await?;
        let socket = match self.connect_socket(&url, &credential).await {
            Err(HandshakeFailure::Unauthorized) => {
                warn!("update stream handshake rejected, re-authenticating");
                let credential = self.session().refresh_after_rejection(&credential).await?;
                match self.connect_socket(&url, &credential).await {
                    Ok(socket) => socket,
                    Err(HandshakeFailure::Unauthorized) => {
                        self.session().invalidate();
                        return Err(Error::Unauthorized);
                    }
                    Err(HandshakeFailure::Other(e)) => return Err(e),
                }
            }
            Err(HandshakeFailure::Other(e)) => return Err(e),
            Ok(socket) => socket,
        };

        let mut stream = UpdateStream {
            socket,
            idle_timeout: self.transport().long_poll_timeout,
        };

        let subscription = serde_json::to_string(&MonitorRequest::area_state(cursor))
            .map_err(|e| Error::WebSocketConnect(format!("failed to encode subscription: {e}")))?;
        stream
            .socket
            .send(Message::text(subscription))
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        info!(url = %url, cursor, "update stream connected");
        Ok(stream)
    }

    async fn connect_socket(
        &self,
        url: &Url,
        credential: &Credential,
    ) -> Result<Socket, HandshakeFailure> {
        debug!(url = %url, "connecting update stream");

        let uri: tungstenite::http::Uri = url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| {
                HandshakeFailure::Other(Error::WebSocketConnect(e.to_string()))
            },
        )?;
        let (name, value) = credential.header_pair();
        let request = ClientRequestBuilder::new(uri).with_header(name, value);

        let connector = self
            .transport()
            .websocket_tls()
            .map_err(HandshakeFailure::Other)?
            .map(Connector::Rustls);

        let timeout = self.transport().timeout;
        let connect =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);

        match tokio::time::timeout(timeout, connect).await {
            Err(_) => Err(HandshakeFailure::Other(Error::Timeout(timeout))),
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(tungstenite::Error::Http(resp)))
                if resp.status() == tungstenite::http::StatusCode::UNAUTHORIZED =>
            {
                Err(HandshakeFailure::Unauthorized)
            }
            Ok(Err(e)) => Err(HandshakeFailure::Other(Error::WebSocketConnect(e.to_string()))),
        }
    }
}

enum HandshakeFailure {
    Unauthorized,
    Other(Error),
}

/// Turn an `http(s)` API root plus path into a `ws(s)` URL.
fn stream_url(base: &Url, path: &str) -> Result<Url, Error> {
    let mut url = base.join(path)?;
    let scheme = match url.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive stream URL from {base}")))?;
    Ok(url)
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Frame shapes seen on the stream.
///
/// Order matters: the full envelope is tried first, then a bare result
/// object, then a bare update array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamFrame {
    Envelope(MonitorResponse),
    Result(UpdateBatch),
    Updates(Vec<AreaUpdate>),
}

fn parse_frame(text: &str) -> Result<UpdateBatch, Error> {
    let frame: StreamFrame = serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (frame preview: {:?})", preview(text)),
        body: text.to_owned(),
    })?;

    Ok(match frame {
        StreamFrame::Envelope(envelope) => envelope.result,
        StreamFrame::Result(batch) => batch,
        StreamFrame::Updates(updates) => UpdateBatch {
            update_time: None,
            updates,
        },
    })
}
