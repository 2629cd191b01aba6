use crate::channel::Channel;
use crate::error::ChannelError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// The browser-oriented transport (spec.md §4.E): bolt messages framed as
/// binary WebSocket frames instead of a raw TCP byte stream. Native
/// builds of this driver use it identically to [`crate::TcpChannel`]
/// from the connection layer's point of view — both implement
/// [`Channel`] — which is what lets the Channel contract stay transport
/// agnostic per spec.md §4.F's control flow.
pub struct WsChannel {
    ws: WsStream,
    encrypted: bool,
}

impl WsChannel {
    /// Connect to a `ws://` or `wss://` URL. Encryption follows the
    /// scheme, same as the native transport follows its trust strategy.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, ChannelError> {
        let encrypted = url.starts_with("wss://");
        let (ws, _response) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| ChannelError::ConnectTimeout)?
            .map_err(|e| ChannelError::WebSocket(e.to_string()))?;
        debug!(url, encrypted, "websocket channel connected");
        Ok(WsChannel { ws, encrypted })
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, buf: Bytes) -> Result<(), ChannelError> {
        self.ws
            .send(Message::Binary(buf))
            .await
            .map_err(|e| ChannelError::WebSocket(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, ChannelError> {
        loop {
            match self.ws.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(ChannelError::WebSocket(e.to_string())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(data))) => {
                    self.ws
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| ChannelError::WebSocket(e.to_string()))?;
                }
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Err(e) = self.ws.close(None).await {
            warn!(error = %e, "error closing websocket channel");
        }
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}
