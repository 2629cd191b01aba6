//! spec.md §8 S1: magic preamble + four version proposals over a real
//! loopback socket, a plaintext reply selecting one of them, a HELLO
//! exchange, and a connection that ends up `Ready` (`is_open() == true`).
//!
//! Unlike the lower-level `bolt-connection` crate's own handshake tests
//! (which run over an in-memory duplex pair), this drives a real
//! [`tokio::net::TcpListener`] end to end through [`TcpChannel`] on the
//! client side and [`RawTcpChannel`] on the accept side, so the literal
//! bytes written to the wire can be inspected directly.

use bolt_channel::{Channel, TcpChannel, TrustStrategy};
use bolt_connection::{AuthToken, Connection, HelloOptions, ProtocolVersion};
use bolt_packstream::{Structure, Value};
use bolt_test_utils::{run_script, RawTcpChannel, ScriptStep};
use indexmap::IndexMap;
use std::time::Duration;
use tokio::net::TcpListener;

fn success(fields: Vec<(&str, Value)>) -> Value {
    let map: IndexMap<String, Value> = fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
    Value::Structure(Structure::new(0x70, vec![Value::Map(map)]))
}

#[tokio::test]
async fn handshake_then_hello_reaches_ready_over_a_real_socket() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut raw = stream;
        // Read the magic preamble + four 4-byte proposals before
        // handing off to `run_fake_server`, so the literal handshake
        // bytes are asserted here rather than hidden inside the helper.
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut handshake = [0u8; 20];
        raw.read_exact(&mut handshake).await.unwrap();
        assert_eq!(&handshake[0..4], &[0x60, 0x60, 0xB0, 0x17]);
        assert_eq!(&handshake[4..8], &ProtocolVersion::V4_3.encode_proposal());
        assert_eq!(&handshake[8..12], &ProtocolVersion::V4_0.encode_proposal());
        assert_eq!(&handshake[12..16], &ProtocolVersion::V3.encode_proposal());
        assert_eq!(&handshake[16..20], &ProtocolVersion::V1.encode_proposal());

        raw.write_all(&u32::from_be_bytes([0, 0, 0, 4]).to_be_bytes()).await.unwrap();
        let mut channel = RawTcpChannel::new(raw);
        let script = vec![ScriptStep::reply(success(vec![]))];
        run_script(&mut channel, script).await;
    });

    let channel = TcpChannel::connect("127.0.0.1", addr.port(), &TrustStrategy::Off, Duration::from_secs(5))
        .await
        .unwrap();
    let auth = AuthToken::basic("neo4j", "pw");
    let hello =
        HelloOptions { user_agent: "bolt-driver/0.1", auth: &auth, routing_context: None, database: None };
    let conn = Connection::connect(channel, hello).await.unwrap();

    assert_eq!(conn.protocol_version(), ProtocolVersion::V4_0);
    assert!(conn.is_open());
    assert!(!conn.is_encrypted());

    server.await.unwrap();
}

#[tokio::test]
async fn wrong_endpoint_http_reply_is_fatal() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut channel = RawTcpChannel::new(stream);
        // "HTTP" in ASCII, the well-known wrong-endpoint handshake reply.
        channel.send(bytes::Bytes::from_static(b"HTTP")).await.unwrap();
    });

    let channel = TcpChannel::connect("127.0.0.1", addr.port(), &TrustStrategy::Off, Duration::from_secs(5))
        .await
        .unwrap();
    let auth = AuthToken::basic("neo4j", "pw");
    let hello = HelloOptions { user_agent: "ua", auth: &auth, routing_context: None, database: None };
    let err = Connection::connect(channel, hello).await.unwrap_err();
    assert!(matches!(err, bolt_connection::ConnectionError::WrongEndpoint));
}
