//! Trust settings for `https` agent endpoints.

use std::path::PathBuf;
#[cfg(feature = "rustls")]
use std::sync::Arc;

#[cfg(feature = "rustls")]
use rustls::pki_types::pem::PemObject;
#[cfg(feature = "rustls")]
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
#[cfg(feature = "rustls")]
use tracing::debug;

#[cfg(feature = "rustls")]
use crate::Error;

/// How peer agents reached over `https` are authenticated.
///
/// Peers are verified against the platform root store. Agents deployed in a
/// private network usually sit behind their own CA; its certificate can be
/// added from a file, inline PEM, or both. Extra roots are trusted on top of
/// the platform roots.
///
/// Certificates are read when the transport starts, so a bad path or PEM
/// fails [`HttpTransport::start`](crate::HttpTransport::start) with
/// [`ErrorKind::Configuration`](crate::ErrorKind::Configuration) instead of
/// failing every delivery later.
///
/// ## Example: Private agent network
///
/// ```rust
/// use agent_outbound_http::TlsConfig;
///
/// let config = TlsConfig::builder()
///     .ca_cert_file("/etc/agent/network-ca.crt")
///     .build();
/// assert!(config.has_custom_ca());
/// ```
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct TlsConfig {
    /// PEM file with extra CA certificates for peer agents.
    #[builder(into)]
    pub ca_cert_file: Option<PathBuf>,

    /// Inline PEM with extra CA certificates for peer agents.
    #[builder(into)]
    pub ca_cert_pem: Option<String>,

    /// Accept any server certificate.
    ///
    /// **WARNING**: Peers are not authenticated. Only for local agents with
    /// self-signed certificates.
    #[builder(default = false)]
    pub skip_verification: bool,
}

impl TlsConfig {
    /// Accepts any server certificate.
    ///
    /// **WARNING**: Messages may be delivered to an impostor. Only use this
    /// against local development agents.
    pub fn insecure() -> Self {
        Self::builder().skip_verification(true).build()
    }

    /// Returns `true` if extra CA certificates are configured.
    pub fn has_custom_ca(&self) -> bool {
        self.ca_cert_file.is_some() || self.ca_cert_pem.is_some()
    }

    /// Reads the extra CA certificates from the file and the inline PEM.
    #[cfg(feature = "rustls")]
    pub(crate) fn custom_roots(&self) -> Result<Vec<CertificateDer<'static>>, Error> {
        let mut roots = Vec::new();

        if let Some(ref path) = self.ca_cert_file {
            let pem = std::fs::read(path).map_err(|e| {
                Error::configuration(format!("Failed to read certificate {:?}: {}", path, e))
                    .with_source(e)
            })?;
            roots.extend(parse_pem_roots(&pem, &format!("{:?}", path))?);
        }

        if let Some(ref pem) = self.ca_cert_pem {
            roots.extend(parse_pem_roots(pem.as_bytes(), "CA certificate PEM")?);
        }

        Ok(roots)
    }

    /// Builds the rustls client configuration used for `https` peers.
    #[cfg(feature = "rustls")]
    pub(crate) fn client_config(&self) -> Result<rustls::ClientConfig, Error> {
        let custom_roots = self.custom_roots()?;

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| {
                Error::configuration(format!("Unsupported TLS provider: {}", e)).with_source(e)
            })?;

        if self.skip_verification {
            return Ok(builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
                .with_no_client_auth());
        }

        let mut roots = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            debug!("skipped platform certificate: {error}");
        }
        let (loaded, ignored) = roots.add_parsable_certificates(native.certs);
        debug!(loaded, ignored, "platform root certificates loaded");

        for cert in custom_roots {
            roots.add(cert).map_err(|e| {
                Error::configuration(format!("Invalid CA certificate: {}", e)).with_source(e)
            })?;
        }

        Ok(builder.with_root_certificates(roots).with_no_client_auth())
    }
}

/// Parses every certificate in `pem`; at least one is required.
#[cfg(feature = "rustls")]
fn parse_pem_roots(pem: &[u8], origin: &str) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::configuration(format!("Invalid certificate in {}: {}", origin, e)))?;

    if certs.is_empty() {
        return Err(Error::configuration(format!(
            "No certificate found in {}",
            origin
        )));
    }
    Ok(certs)
}

/// Server certificate verifier that accepts any certificate (insecure).
#[cfg(feature = "rustls")]
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<rustls::crypto::CryptoProvider>);

#[cfg(feature = "rustls")]
impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
