use crate::error::ChannelError;
use crate::known_hosts::KnownHosts;
use crate::verifier::{AcceptAllVerifier, OnFirstUseVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use std::path::PathBuf;
use std::sync::Arc;

/// The TLS trust strategies spec.md §4.E enumerates for the native socket
/// transport. `Off` carries no TLS at all.
#[derive(Clone)]
pub enum TrustStrategy {
    Off,
    CustomCAs(Vec<PathBuf>),
    SystemCAs,
    All,
    OnFirstUse(Arc<KnownHosts>),
}

impl TrustStrategy {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, TrustStrategy::Off)
    }

    /// Build the `rustls::ClientConfig` this strategy implies for a
    /// connection to `host:port`. Only called for strategies other than
    /// `Off`, which never constructs a TLS connector at all.
    pub fn client_config(&self, host: &str, port: u16) -> Result<ClientConfig, ChannelError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| ChannelError::Tls(e.to_string()))?;

        let config = match self {
            TrustStrategy::Off => unreachable!("Off never builds a TLS config"),
            TrustStrategy::CustomCAs(paths) => {
                let mut roots = RootCertStore::empty();
                for path in paths {
                    load_pem_certs_into(&mut roots, path)?;
                }
                builder.with_root_certificates(roots).with_no_client_auth()
            }
            TrustStrategy::SystemCAs => {
                let mut roots = RootCertStore::empty();
                let native = rustls_native_certs::load_native_certs();
                for err in native.errors {
                    return Err(ChannelError::Tls(format!(
                        "loading system trust store: {err}"
                    )));
                }
                for cert in native.certs {
                    roots
                        .add(cert)
                        .map_err(|e| ChannelError::Tls(e.to_string()))?;
                }
                builder.with_root_certificates(roots).with_no_client_auth()
            }
            TrustStrategy::All => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier::new(provider)))
                .with_no_client_auth(),
            TrustStrategy::OnFirstUse(known_hosts) => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(OnFirstUseVerifier::new(
                    provider,
                    known_hosts.clone(),
                    host.to_owned(),
                    port,
                )))
                .with_no_client_auth(),
        };
        Ok(config)
    }
}

fn load_pem_certs_into(roots: &mut RootCertStore, path: &std::path::Path) -> Result<(), ChannelError> {
    let file = std::fs::File::open(path).map_err(ChannelError::Io)?;
    let mut reader = std::io::BufReader::new(file);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(ChannelError::Io)?;
        roots
            .add(cert)
            .map_err(|e| ChannelError::Tls(e.to_string()))?;
    }
    Ok(())
}

