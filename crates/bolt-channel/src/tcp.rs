use crate::channel::Channel;
use crate::error::ChannelError;
use crate::trust::TrustStrategy;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rustls_pki_types::ServerName;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default native-protocol port (spec.md §6).
pub const DEFAULT_PORT: u16 = 7687;

const READ_BUFFER_SIZE: usize = 64 * 1024;

enum Inner {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// The native socket transport: a TCP connection, optionally wrapped in
/// TLS per the configured [`TrustStrategy`] (spec.md §4.E).
pub struct TcpChannel {
    inner: Inner,
    encrypted: bool,
}

impl TcpChannel {
    /// Open a TCP connection to `host:port`, applying `trust` to decide
    /// whether (and how) to layer TLS on top. `connect_timeout` bounds
    /// only the initial TCP handshake, per spec.md §5's cancellation
    /// rules — the caller is responsible for bounding the TLS handshake
    /// if it wants a single combined deadline.
    pub async fn connect(
        host: &str,
        port: u16,
        trust: &TrustStrategy,
        connect_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let tcp = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ChannelError::ConnectTimeout)??;
        tcp.set_nodelay(true).ok();

        if matches!(trust, TrustStrategy::Off) {
            debug!(host, port, "tcp channel connected, unencrypted");
            return Ok(TcpChannel {
                inner: Inner::Plain(tcp),
                encrypted: false,
            });
        }

        let config = trust.client_config(host, port)?;
        let connector = tokio_rustls::TlsConnector::from(std::sync::Arc::new(config));
        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|_| ChannelError::InvalidServerName(host.to_owned()))?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ChannelError::Tls(e.to_string()))?;
        info!(host, port, "tcp channel connected over tls");
        Ok(TcpChannel {
            inner: Inner::Tls(Box::new(tls)),
            encrypted: true,
        })
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, buf: Bytes) -> Result<(), ChannelError> {
        let result = match &mut self.inner {
            Inner::Plain(s) => s.write_all(&buf).await,
            Inner::Tls(s) => s.write_all(&buf).await,
        };
        result.map_err(ChannelError::Io)
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, ChannelError> {
        let mut scratch = BytesMut::zeroed(READ_BUFFER_SIZE);
        let n = match &mut self.inner {
            Inner::Plain(s) => s.read(&mut scratch).await,
            Inner::Tls(s) => s.read(&mut scratch).await,
        }
        .map_err(ChannelError::Io)?;
        if n == 0 {
            return Ok(None);
        }
        scratch.truncate(n);
        Ok(Some(scratch.freeze()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        let result = match &mut self.inner {
            Inner::Plain(s) => s.shutdown().await,
            Inner::Tls(s) => s.shutdown().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "error shutting down tcp channel");
        }
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}
