use bolt_buffer::ReadBuf;
use bolt_channel::Channel;
use bolt_chunking::{Chunker, Dechunker};
use bolt_packstream::{Packer, Value};
use bytes::{Bytes, BytesMut};

/// One scripted exchange: wait for exactly one request message from the
/// client (its contents are ignored), then send `responses` in order —
/// e.g. `[RECORD, RECORD, SUCCESS]` for a `PULL` that streams two rows.
pub struct ScriptStep {
    pub responses: Vec<Value>,
}

impl ScriptStep {
    pub fn reply(response: Value) -> Self {
        ScriptStep { responses: vec![response] }
    }

    pub fn replies(responses: Vec<Value>) -> Self {
        ScriptStep { responses }
    }
}

/// Drives the server side of any [`Channel`] (an in-memory
/// [`crate::DuplexChannel`] or a real [`bolt_channel::TcpChannel`]
/// accepted off a loopback listener) through the bolt handshake and a
/// fixed script of request/response exchanges, without ever inspecting
/// what the client actually sent — good enough for connection-layer
/// tests where only response ordering and framing matter (spec.md §4.F
/// observer-queue ordering, §4.D chunk framing).
pub async fn run_fake_server<C: Channel>(mut channel: C, handshake_reply: u32, script: Vec<ScriptStep>) {
    if !perform_handshake(&mut channel, handshake_reply).await {
        return;
    }
    run_script(&mut channel, script).await;
}

/// Reads and discards the magic preamble + four version proposals, then
/// sends back `handshake_reply`. Returns `false` if the channel closed
/// mid-handshake. Split out of [`run_fake_server`] so a caller that wants
/// to assert the literal handshake bytes itself (spec.md §4.C) can read
/// them directly off the socket and only hand off to [`run_script`]
/// afterwards.
pub async fn perform_handshake<C: Channel>(channel: &mut C, handshake_reply: u32) -> bool {
    let mut handshake_buf = BytesMut::new();
    while handshake_buf.len() < 20 {
        match channel.recv().await {
            Ok(Some(chunk)) => handshake_buf.extend_from_slice(&chunk),
            _ => return false,
        }
    }
    channel.send(Bytes::copy_from_slice(&handshake_reply.to_be_bytes())).await.is_ok()
}

/// Drives a fixed script of request/response exchanges over a channel
/// whose handshake has already completed (see [`perform_handshake`]).
pub async fn run_script<C: Channel>(channel: &mut C, script: Vec<ScriptStep>) {
    let mut dechunker = Dechunker::new();

    for step in script {
        loop {
            // A client may pipeline several requests into one flush
            // (spec.md §5 — e.g. a session's RUN immediately followed by
            // PULL in the same write). Drain whatever the dechunker
            // already has buffered from an earlier read before blocking
            // on another `recv`, or a pipelined second message would
            // never be noticed until bytes for a *third* message arrive.
            if let Some(mut msg) = dechunker.next_message() {
                let n = msg.remaining();
                let _ = msg.read_slice(n);
                break;
            }
            let chunk = match channel.recv().await {
                Ok(Some(c)) => c,
                _ => return,
            };
            if dechunker.feed(chunk).is_err() {
                return;
            }
        }

        for response in &step.responses {
            let mut chunker = Chunker::new();
            if Packer::new(&mut chunker).pack(response).is_err() {
                return;
            }
            if chunker.message_boundary().is_err() {
                return;
            }
            match chunker.flush() {
                Ok(bytes) => {
                    if channel.send(bytes).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            }
        }
    }
}
