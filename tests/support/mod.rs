// Shared helpers: boot a relay on an ephemeral port and drive it with real
// WebSocket clients.
#![allow(dead_code)]

use drive_relay::interface_adapters::state::AppState;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Start a fresh relay for one test and return its ws:// endpoint.
pub async fn start_server() -> String {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    // Capture the exact address that was assigned by the OS.
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        drive_relay::run(listener).await.expect("server failed");
    });
    format!("ws://{addr}/ws")
}

// Like `start_server`, but serves a caller-built state so the test can keep
// handles to its registry and tune queue sizes.
pub async fn start_server_with(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        drive_relay::serve(listener, Arc::new(state))
            .await
            .expect("server failed");
    });
    format!("ws://{addr}/ws")
}

pub struct TestClient {
    ws: Ws,
}

impl TestClient {
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("websocket connect");
        Self { ws }
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send frame");
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn join(&mut self) {
        self.send_json(serde_json::json!({"type": 1, "payload": null}))
            .await;
    }

    /// Joins and consumes the three handshake replies, returning the player id.
    pub async fn join_and_drain(&mut self) -> String {
        self.join().await;
        let join = self.next_json().await;
        assert_eq!(join["type"], 1, "expected join response, got {join}");
        self.next_json().await;
        self.next_json().await;
        join["payload"]["player_id"]
            .as_str()
            .expect("player id")
            .to_string()
    }

    // Read the next text frame as JSON, skipping control frames.
    pub async fn next_json(&mut self) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for WS message")
                .expect("stream ended")
                .expect("WS error");
            match msg {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("invalid JSON");
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("expected Text message, got {other:?}"),
            }
        }
    }

    // Assert nothing but control frames arrive within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return,
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
                Ok(other) => panic!("expected silence, got {other:?}"),
            }
        }
    }

    // Wait until the server closes the connection.
    pub async fn expect_closed(&mut self) {
        loop {
            let next = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for close");
            match next {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
