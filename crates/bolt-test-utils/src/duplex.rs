use bolt_channel::{Channel, ChannelError};
use bytes::Bytes;
use tokio::sync::mpsc;

/// One end of an in-memory, lossless byte pipe implementing
/// [`bolt_channel::Channel`] — stands in for a real TCP/WebSocket
/// transport so connection-layer tests never touch a socket.
pub struct DuplexChannel {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    encrypted: bool,
}

/// Build a connected pair: bytes sent on one end arrive, in order and
/// unsplit, as the same `Bytes` chunk on the other end's `recv`.
pub fn duplex_pair() -> (DuplexChannel, DuplexChannel) {
    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();
    (
        DuplexChannel { tx: a_to_b_tx, rx: b_to_a_rx, encrypted: false },
        DuplexChannel { tx: b_to_a_tx, rx: a_to_b_rx, encrypted: false },
    )
}

#[async_trait::async_trait]
impl Channel for DuplexChannel {
    async fn send(&mut self, buf: Bytes) -> Result<(), ChannelError> {
        self.tx.send(buf).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, ChannelError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}
