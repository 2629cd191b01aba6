//! Exercises [`TcpChannel`] against a real loopback listener: plaintext
//! send/recv, clean close reported as `Ok(None)`, and the `trust = off`
//! strategy never touching TLS.

use bolt_channel::{Channel, TcpChannel, TrustStrategy};
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[tokio::test]
async fn plaintext_round_trip() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 5];
        sock.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        sock.write_all(b"world").await.unwrap();
        sock.shutdown().await.unwrap();
    });

    let mut channel = TcpChannel::connect(
        "127.0.0.1",
        addr.port(),
        &TrustStrategy::Off,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(!channel.is_encrypted());

    channel.send(Bytes::from_static(b"hello")).await.unwrap();
    let mut received = Vec::new();
    while received.len() < 5 {
        match channel.recv().await.unwrap() {
            Some(chunk) => received.extend_from_slice(&chunk),
            None => break,
        }
    }
    assert_eq!(received, b"world");

    server.await.unwrap();
}

#[tokio::test]
async fn clean_remote_close_yields_none() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        drop(sock);
    });

    let mut channel = TcpChannel::connect(
        "127.0.0.1",
        addr.port(),
        &TrustStrategy::Off,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // Give the server task a moment to drop its side.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(channel.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn connect_timeout_fails_fast_against_a_black_hole_address() {
    // 10.255.255.1 is a non-routable address commonly used to force a
    // connect timeout in CI sandboxes without external network access.
    let result = TcpChannel::connect(
        "10.255.255.1",
        7687,
        &TrustStrategy::Off,
        Duration::from_millis(50),
    )
    .await;
    assert!(result.is_err());
}
