//! rustls helpers for `wss://` signaling pinned to a private CA.
use rustls::{ClientConfig, RootCertStore, pki_types::CertificateDer};
use rustls_pemfile::certs;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::Arc,
};

/// Reads every certificate from a PEM stream.
///
/// # Errors
/// `InvalidData` if the PEM is malformed or holds no certificates.
pub fn read_certs(reader: &mut dyn BufRead) -> io::Result<Vec<CertificateDer<'static>>> {
    let found: Vec<CertificateDer<'static>> = certs(reader)
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid PEM: {e}")))?;

    if found.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "PEM did not contain any certificates",
        ));
    }
    Ok(found)
}

/// Loads a certificate chain from a PEM file.
///
/// # Errors
/// Returns an `io::Error` if the file cannot be opened or holds no valid certificate.
pub fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("opening CA {}: {e}", path.display())))?;
    read_certs(&mut BufReader::new(file))
}

/// Builds a `RootCertStore` that trusts ONLY the CAs in `path`.
///
/// # Errors
/// Propagates [`load_certs`] failures and rejects certificates rustls cannot parse.
pub fn build_pinned_root_store(path: &Path) -> io::Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certs(path)? {
        root_store
            .add(cert)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad CA cert: {e}")))?;
    }
    Ok(root_store)
}

/// Client config for the signaling socket trusting only the CA in `path`.
///
/// # Errors
/// See [`build_pinned_root_store`].
pub fn build_signaling_client_config(path: &Path) -> io::Result<Arc<ClientConfig>> {
    let root_store = build_pinned_root_store(path)?;
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Ok(Arc::new(config))
}
