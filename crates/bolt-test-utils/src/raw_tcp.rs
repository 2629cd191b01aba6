use bolt_channel::{Channel, ChannelError};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// The accept-side counterpart to [`bolt_channel::TcpChannel`] (which
/// only knows how to dial out): wraps a plain [`TcpStream`] accepted off
/// a loopback [`tokio::net::TcpListener`] so [`crate::run_fake_server`]
/// can drive a real socket, not just an in-memory [`crate::DuplexChannel`]
/// — used by the root crate's end-to-end tests, which exercise
/// [`bolt_driver::Driver`] (hardcoded to `TcpChannel` on the client side)
/// against a scripted server.
pub struct RawTcpChannel {
    stream: TcpStream,
}

impl RawTcpChannel {
    pub fn new(stream: TcpStream) -> Self {
        stream.set_nodelay(true).ok();
        RawTcpChannel { stream }
    }
}

#[async_trait::async_trait]
impl Channel for RawTcpChannel {
    async fn send(&mut self, buf: Bytes) -> Result<(), ChannelError> {
        self.stream.write_all(&buf).await.map_err(ChannelError::Io)
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, ChannelError> {
        let mut scratch = BytesMut::zeroed(READ_BUFFER_SIZE);
        let n = self.stream.read(&mut scratch).await.map_err(ChannelError::Io)?;
        if n == 0 {
            return Ok(None);
        }
        scratch.truncate(n);
        Ok(Some(scratch.freeze()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if let Err(e) = self.stream.shutdown().await {
            tracing::warn!(error = %e, "error shutting down raw tcp channel");
        }
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        false
    }
}
