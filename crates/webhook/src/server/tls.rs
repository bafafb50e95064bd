//! TLS listener setup using rustls.
//!
//! The certificate and private key are PEM files provisioned out of band
//! (typically a mounted secret). This module loads them and constructs a
//! `rustls::ServerConfig`.

use std::{io, path::Path, path::PathBuf, sync::Arc};

use rustls::ServerConfig;
use thiserror::Error;

/// ALPN protocols offered to clients, most preferred first.
const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Errors loading the TLS certificate/key pair.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A PEM file could not be read from disk.
    #[error("failed to read {what} file {}: {source}", .path.display())]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse TLS certificate chain: {0}")]
    Certificate(#[source] io::Error),

    #[error("missing PEM block with type: CERTIFICATE")]
    MissingCertificate,

    #[error("failed to read TLS private key: {0}")]
    Key(#[source] io::Error),

    #[error("no private key found in PEM data")]
    MissingKey,

    #[error("failed to build rustls ServerConfig: {0}")]
    Config(#[from] rustls::Error),
}

/// Read the PEM pair at `cert_path` / `key_path` and build a server config.
///
/// # Errors
///
/// Returns [`TlsError::Read`] if either file is missing or unreadable, and the
/// errors of [`build_server_config`] otherwise.
pub async fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<Arc<ServerConfig>, TlsError> {
    let cert_pem = read_pem("certificate", cert_path).await?;
    let key_pem = read_pem("private key", key_path).await?;
    build_server_config(&cert_pem, &key_pem)
}

async fn read_pem(what: &'static str, path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Read {
        what,
        path: path.to_owned(),
        source,
    })
}

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// The first private key of any supported encoding (PKCS#1, PKCS#8, SEC1) is
/// used. Both HTTP/2 and HTTP/1.1 are offered via ALPN.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the pair.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = rustls_pemfile::certs(&mut io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsError::Certificate)?;
    if certs.is_empty() {
        return Err(TlsError::MissingCertificate);
    }

    let key = rustls_pemfile::private_key(&mut io::BufReader::new(key_pem))
        .map_err(TlsError::Key)?
        .ok_or(TlsError::MissingKey)?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_CRT: &[u8] = include_bytes!("../../tests/fixtures/tls.crt");
    const FIXTURE_KEY: &[u8] = include_bytes!("../../tests/fixtures/tls.key");

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", FIXTURE_KEY);
        assert!(matches!(result, Err(TlsError::MissingCertificate)));
    }

    #[test]
    fn rejects_missing_key() {
        let result = build_server_config(FIXTURE_CRT, b"not a pem");
        assert!(matches!(result, Err(TlsError::MissingKey)));
    }

    #[test]
    fn rejects_swapped_pair() {
        assert!(build_server_config(FIXTURE_KEY, FIXTURE_CRT).is_err());
    }

    #[test]
    fn accepts_fixture_pair_and_offers_alpn() {
        let config = build_server_config(FIXTURE_CRT, FIXTURE_KEY).unwrap();
        assert_eq!(
            config.alpn_protocols,
            vec![b"h2".to_vec(), b"http/1.1".to_vec()]
        );
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let err = load_server_config(
            Path::new("/nonexistent/tls.crt"),
            Path::new("/nonexistent/tls.key"),
        )
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("certificate"), "{msg}");
        assert!(msg.contains("/nonexistent/tls.crt"), "{msg}");
    }
}
