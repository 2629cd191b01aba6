//! Custom `rustls` server-certificate verifiers for the trust strategies
//! spec.md §4.E enumerates beyond plain CA-chain verification: `all`
//! (accept any well-formed certificate) and `on-first-use` (TOFU against
//! a known-hosts fingerprint cache).

use crate::known_hosts::{sha512_hex, KnownHosts};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use std::fmt;
use std::sync::Arc;

/// Accepts any well-formed certificate chain without verifying it against
/// any trust anchor. Corresponds to the `all` trust strategy — explicitly
/// insecure, only ever reached when the caller asked for it by name.
pub struct AcceptAllVerifier {
    provider: Arc<CryptoProvider>,
}

impl AcceptAllVerifier {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        AcceptAllVerifier { provider }
    }
}

impl fmt::Debug for AcceptAllVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptAllVerifier").finish()
    }
}

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Trust-on-first-use: verifies the leaf certificate's SHA-512 fingerprint
/// against a cache keyed by `host:port`. An unseen host is trusted and
/// recorded; a host whose fingerprint has changed fails the handshake.
///
/// Signature verification is still delegated to the real crypto
/// provider — only the "is this the CA I expect" step is replaced by
/// fingerprint pinning, per spec.md's "fail on change" requirement.
pub struct OnFirstUseVerifier {
    provider: Arc<CryptoProvider>,
    known_hosts: Arc<KnownHosts>,
    host: String,
    port: u16,
}

impl OnFirstUseVerifier {
    pub fn new(
        provider: Arc<CryptoProvider>,
        known_hosts: Arc<KnownHosts>,
        host: String,
        port: u16,
    ) -> Self {
        OnFirstUseVerifier {
            provider,
            known_hosts,
            host,
            port,
        }
    }
}

impl fmt::Debug for OnFirstUseVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnFirstUseVerifier")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ServerCertVerifier for OnFirstUseVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let fingerprint = sha512_hex(end_entity.as_ref());
        match self.known_hosts.fingerprint_for(&self.host, self.port) {
            Some(known) if known == fingerprint => Ok(ServerCertVerified::assertion()),
            Some(_) => Err(TlsError::General(format!(
                "{}:{} fingerprint changed since it was first trusted",
                self.host, self.port
            ))),
            None => {
                self.known_hosts
                    .record(&self.host, self.port, &fingerprint)
                    .map_err(|e| TlsError::General(e.to_string()))?;
                Ok(ServerCertVerified::assertion())
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
