// tests/property/framing_test.rs

//! Property-based tests for the chunk framing.
//! Any message survives any chunk size, however the stream is sliced.

use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};
use zcli::core::protocol::frame::chunk_count;
use zcli::core::protocol::{ChunkCodec, Message};

fn encode_all(chunk_size: usize, msgs: &[Message]) -> BytesMut {
    let mut codec = ChunkCodec::with_chunk_size(chunk_size).unwrap();
    let mut buf = BytesMut::new();
    for msg in msgs {
        codec.encode(msg.clone(), &mut buf).unwrap();
    }
    buf
}

fn message() -> impl Strategy<Value = Message> {
    ("(/[a-z]{1,8}){0,3}", ".{0,300}").prop_map(|(path, payload)| Message::new(path, payload))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_back_to_back_messages_roundtrip(
        chunk_size in 1usize..64,
        msgs in prop::collection::vec(message(), 1..8)
    ) {
        let mut wire = encode_all(chunk_size, &msgs);
        let mut codec = ChunkCodec::with_chunk_size(chunk_size).unwrap();

        let mut decoded = Vec::new();
        while let Some(msg) = codec.decode(&mut wire).unwrap() {
            decoded.push(msg);
        }
        prop_assert!(wire.is_empty());
        prop_assert_eq!(decoded, msgs);
    }

    #[test]
    fn test_arbitrary_slicing_roundtrip(
        chunk_size in 1usize..64,
        msgs in prop::collection::vec(message(), 1..4),
        cuts in prop::collection::vec(1usize..97, 1..32)
    ) {
        let wire = encode_all(chunk_size, &msgs);
        let mut codec = ChunkCodec::with_chunk_size(chunk_size).unwrap();
        let mut src = BytesMut::new();
        let mut decoded = Vec::new();

        let mut offset = 0;
        let mut cut = cuts.iter().cycle();
        while offset < wire.len() {
            let end = (offset + cut.next().copied().unwrap_or(1)).min(wire.len());
            src.extend_from_slice(&wire[offset..end]);
            offset = end;
            while let Some(msg) = codec.decode(&mut src).unwrap() {
                decoded.push(msg);
            }
        }
        prop_assert_eq!(decoded, msgs);
    }

    #[test]
    fn test_wire_size_follows_chunk_count(
        chunk_size in 1usize..64,
        msg in message()
    ) {
        let body = msg.encoded_len();
        let wire = encode_all(chunk_size, std::slice::from_ref(&msg));
        let chunks = chunk_count(body, chunk_size);

        // One control byte per chunk, plus the terminal length field.
        prop_assert_eq!(wire.len(), body + chunks + 4);
        prop_assert_eq!(wire[0] == 0xFF, chunks == 1);
    }

    #[test]
    fn test_exact_multiples_use_k_chunks(
        chunk_size in 1usize..64,
        k in 1usize..6
    ) {
        prop_assert_eq!(chunk_count(k * chunk_size, chunk_size), k);
        prop_assert_eq!(chunk_count(k * chunk_size + 1, chunk_size), k + 1);
    }
}
