// src/live/transport.rs

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use crate::error::AppError;

/// Opens text-frame connections to the realtime service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, AppError>;
}

/// An open realtime connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), AppError>;

    /// Next text frame. `None` once the peer has closed the connection.
    async fn next(&mut self) -> Option<Result<String, AppError>>;

    async fn close(&mut self);
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, AppError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), AppError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| AppError::Transport(e.to_string()))
    }

    async fn next(&mut self) -> Option<Result<String, AppError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::warn!("Ignoring non UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                // Ping replies are queued by tungstenite itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(AppError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Error while closing realtime socket: {}", e);
        }
    }
}
