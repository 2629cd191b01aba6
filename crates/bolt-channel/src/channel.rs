use crate::error::ChannelError;
use async_trait::async_trait;
use bytes::Bytes;

/// A duplex byte transport (spec.md §4.E): TCP+TLS in native builds,
/// WebSocket-equivalent in browser builds. The connection layer owns
/// exactly one of these per connection and drives it with a
/// [`crate::Chunker`](bolt_chunking::Chunker)/[`Dechunker`](bolt_chunking::Dechunker)
/// pair on top.
///
/// spec.md models this as a callback object (`on_message`/`on_error`
/// fields assigned by the caller); design note §9 explicitly asks
/// implementers not to mirror that duck-typed style. Here the contract
/// is a plain async trait: [`Channel::connect`] does not return until the
/// transport is actually open, so there is no pre-connect write queue to
/// model — a caller simply awaits `connect` before calling `send`.
/// Fatal transport errors (remote close, TLS failure, read after reset)
/// surface as an `Err` from `send`/`recv` rather than a separate
/// callback, which is the same information delivered through the
/// channel every other operation already uses.
#[async_trait]
pub trait Channel: Send {
    /// Send a complete buffer of outbound bytes (already chunked by the
    /// caller). Fails if the channel is closed or the transport reports
    /// a write error.
    async fn send(&mut self, buf: Bytes) -> Result<(), ChannelError>;

    /// Wait for the next chunk of inbound bytes. Returns `Ok(None)` on a
    /// clean remote close (end of stream); any other disruption
    /// (reset, TLS failure) is an `Err`.
    async fn recv(&mut self) -> Result<Option<Bytes>, ChannelError>;

    /// Request graceful shutdown of the underlying socket. Idempotent.
    async fn close(&mut self) -> Result<(), ChannelError>;

    /// Whether this channel is carrying TLS.
    fn is_encrypted(&self) -> bool;
}
