//! spec.md §8 S4: a 70 000-byte message payload framed through a chunker
//! configured up to the hard 65535-byte chunk cap, reassembled bit for bit
//! by the dechunker. spec.md's own length invariant (§7.4: `⌈L/65535⌉`
//! data chunks summing to `L`) pins the split at `[65535, 4465]` for
//! `L = 70_000` — the literal `4377` the prose gives for this scenario
//! doesn't satisfy `65535 + 4377 == 70_000`, so this test follows the
//! invariant rather than that figure.

use bolt_buffer::{ReadBuf, WriteBuf};
use bolt_chunking::{Chunker, Dechunker, MAX_CHUNK_PAYLOAD};

fn chunk_lengths(bytes: &[u8]) -> Vec<usize> {
    let mut lens = Vec::new();
    let mut pos = 0;
    loop {
        let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        pos += 2;
        if len == 0 {
            break;
        }
        lens.push(len);
        pos += len;
    }
    lens
}

#[test]
fn seventy_thousand_byte_payload_splits_at_the_hard_chunk_cap() {
    let payload: Vec<u8> = (0..70_000u32).map(|i| (i % 256) as u8).collect();

    let mut chunker = Chunker::with_capacity(MAX_CHUNK_PAYLOAD);
    chunker.write_bytes(&payload).unwrap();
    chunker.message_boundary().unwrap();
    let framed = chunker.flush().unwrap();

    assert_eq!(&framed[0..2], &[0xFF, 0xFF]);
    let lens = chunk_lengths(&framed);
    assert_eq!(lens, vec![65535, 4465]);
    assert_eq!(lens.iter().sum::<usize>(), payload.len());
    assert_eq!(&framed[framed.len() - 2..], &[0x00, 0x00]);

    let mut dechunker = Dechunker::new();
    // Feed it back in arbitrary small pieces to exercise reassembly across
    // packet boundaries the same way a real socket would fragment it.
    for slice in framed.chunks(4096) {
        dechunker.feed(bytes::Bytes::copy_from_slice(slice)).unwrap();
    }
    let mut msg = dechunker.next_message().unwrap();
    let n = msg.remaining();
    let reconstructed = msg.read_slice(n).unwrap();
    assert_eq!(&*reconstructed, payload.as_slice());
    assert!(dechunker.next_message().is_none());
}
