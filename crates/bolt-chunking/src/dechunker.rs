use crate::error::ChunkingError;
use bolt_buffer::ComposedBuffer;
use bytes::{Buf, Bytes};
use std::collections::VecDeque;

/// Internal state machine (spec.md §4.D). Transitions only happen inside
/// [`Dechunker::feed`]; there is no hidden buffering beyond what's
/// documented here, so arbitrary packet fragmentation — including
/// single-byte feeds — reassembles identically.
enum State {
    /// Waiting for the next 2-byte chunk length header.
    AwaitingChunk,
    /// Saw one byte of a split header; holds the high byte.
    InHeader { high: u8 },
    /// Reading a chunk payload of `remaining` bytes.
    InChunk { remaining: usize },
    Closed,
}

/// Reassembles a stream of inbound bytes into complete messages,
/// regardless of how the underlying transport fragments them across
/// packets. A message boundary is recognised only by the `0x0000`
/// sentinel chunk — never by counting bytes against an expected message
/// size, since none is known in advance.
pub struct Dechunker {
    state: State,
    /// Chunk payloads accumulated for the message currently in progress.
    current_message: Vec<Bytes>,
    /// Complete messages ready to be drained by the caller, in arrival order.
    ready: VecDeque<ComposedBuffer>,
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker {
            state: State::AwaitingChunk,
            current_message: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// Feed newly-arrived bytes from the transport. Any number of
    /// complete messages may become ready; drain them with
    /// [`Dechunker::next_message`].
    pub fn feed(&mut self, mut data: Bytes) -> Result<(), ChunkingError> {
        while data.has_remaining() {
            match std::mem::replace(&mut self.state, State::Closed) {
                State::Closed => return Err(ChunkingError::Closed),
                State::AwaitingChunk => {
                    if data.remaining() >= 2 {
                        let n = data.get_u16();
                        self.on_header(n)?;
                    } else {
                        let high = data.get_u8();
                        self.state = State::InHeader { high };
                    }
                }
                State::InHeader { high } => {
                    let low = data.get_u8();
                    let n = u16::from_be_bytes([high, low]);
                    self.on_header(n)?;
                }
                State::InChunk { remaining } => {
                    if remaining <= data.remaining() {
                        let chunk = data.copy_to_bytes(remaining);
                        self.current_message.push(chunk);
                        self.state = State::AwaitingChunk;
                    } else {
                        let available = data.remaining();
                        let chunk = data.copy_to_bytes(available);
                        self.current_message.push(chunk);
                        self.state = State::InChunk {
                            remaining: remaining - available,
                        };
                    }
                }
            }
        }
        Ok(())
    }

    fn on_header(&mut self, n: u16) -> Result<(), ChunkingError> {
        if n == 0 {
            let parts = std::mem::take(&mut self.current_message);
            self.ready.push_back(ComposedBuffer::new(parts));
            self.state = State::AwaitingChunk;
        } else {
            self.state = State::InChunk {
                remaining: n as usize,
            };
        }
        Ok(())
    }

    /// Pop the next fully-reassembled message, if any.
    pub fn next_message(&mut self) -> Option<ComposedBuffer> {
        self.ready.pop_front()
    }

    /// True if no data is being held mid-header or mid-chunk — i.e. the
    /// stream could be cleanly closed right now.
    pub fn is_at_message_boundary(&self) -> bool {
        matches!(self.state, State::AwaitingChunk) && self.current_message.is_empty()
    }

    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}

impl Default for Dechunker {
    fn default() -> Self {
        Self::new()
    }
}
