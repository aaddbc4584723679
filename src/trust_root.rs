//! Trusted root pool and X.509 chain verification

use crate::error::{Error, Result};
use crate::x509::X509Identity;
use rustls::pki_types::{CertificateDer, SignatureVerificationAlgorithm, UnixTime};
use rustls::RootCertStore;
use rustls_pemfile as pemfile;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webpki::{EndEntityCert, KeyUsage};

/// Immutable set of trusted root certificates
///
/// Cloning is cheap and the pool can be shared read-only between threads.
#[derive(Clone)]
pub struct TrustRootPool {
    roots: Arc<RootCertStore>,
    algorithms: &'static [&'static dyn SignatureVerificationAlgorithm],
}

impl TrustRootPool {
    /// Load a PEM bundle from disk
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| Error::RootLoadError {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Read {} bytes of root CA bundle from {}", pem.len(), path.display());
        Self::from_pem(&pem)
    }

    /// Build a pool from PEM text
    ///
    /// Blocks that are not certificates, or do not parse, are skipped. The
    /// pool must end up with at least one root.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(pem);
        let certs: Vec<CertificateDer<'static>> = pemfile::certs(&mut cursor)
            .filter_map(|cert| match cert {
                Ok(cert) => Some(cert),
                Err(e) => {
                    warn!("Skipping malformed PEM block in root CA bundle: {}", e);
                    None
                }
            })
            .collect();

        Self::from_der(certs)
    }

    /// Build a pool from DER encoded certificates
    pub fn from_der(certs: Vec<CertificateDer<'static>>) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(certs);

        if ignored > 0 {
            warn!("Ignored {} unparsable root certificates", ignored);
        }

        if added == 0 {
            return Err(Error::root_parse("bundle contains no valid certificate"));
        }

        info!("Loaded {} trusted root certificates", added);

        Ok(TrustRootPool {
            roots: Arc::new(roots),
            algorithms: rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .all,
        })
    }

    /// Number of roots in the pool
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Always false; an empty pool cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Verify that `identity` chains to one of the roots at the current time
    ///
    /// The leaf must be an end entity usable for server authentication: a
    /// certificate without an extended key usage extension passes, one that
    /// lists usages must include serverAuth. No intermediates are supplied
    /// and no host name is checked.
    pub fn verify(&self, identity: &X509Identity) -> Result<()> {
        self.verify_at(identity, UnixTime::now())
    }

    fn verify_at(&self, identity: &X509Identity, now: UnixTime) -> Result<()> {
        let der = CertificateDer::from(identity.der());
        let end_entity = EndEntityCert::try_from(&der)
            .map_err(|e| Error::chain(format!("not an end-entity certificate: {}", e)))?;

        end_entity
            .verify_for_usage(
                self.algorithms,
                &self.roots.roots,
                &[],
                now,
                KeyUsage::server_auth(),
                None,
                None,
            )
            .map_err(|e| Error::chain(e.to_string()))?;

        debug!("Verified X.509 chain for '{}'", identity.subject());
        Ok(())
    }
}

impl fmt::Debug for TrustRootPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustRootPool")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// How much the embedded X.509 certificate is trusted
#[derive(Clone, Debug)]
pub enum VerificationMode {
    /// Accept the embedded certificate's claims without a chain check
    Unverified,
    /// Require a valid chain to one of the pool's roots
    ChainVerified(TrustRootPool),
}

impl VerificationMode {
    /// `ChainVerified` from a bundle path, `Unverified` when there is none
    pub fn from_root_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(VerificationMode::ChainVerified(
                TrustRootPool::from_pem_file(path)?,
            )),
            None => Ok(VerificationMode::Unverified),
        }
    }

    /// Whether chain verification runs in this mode
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationMode::ChainVerified(_))
    }
}

/// Run the chain check selected by `mode`
pub fn verify_chain(identity: &X509Identity, mode: &VerificationMode) -> Result<()> {
    match mode {
        VerificationMode::Unverified => {
            debug!("Skipping chain verification for '{}'", identity.subject());
            Ok(())
        }
        VerificationMode::ChainVerified(pool) => pool.verify(identity),
    }
}
