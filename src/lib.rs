//! SSH PKI Agent
//!
//! Validates SSH certificates that carry an X.509 certificate in their
//! `x509` extension and turns the X.509 public key into a `cert-authority`
//! line for an SSH server's authorized-keys mechanism.
//!
//! ```no_run
//! use ssh_pki_agent::{CertificateValidator, TrustRootPool, VerificationMode};
//!
//! let pool = TrustRootPool::from_pem_file("/etc/ssh/x509-roots.pem")?;
//! let validator = CertificateValidator::new(VerificationMode::ChainVerified(pool));
//!
//! let line = validator.validate("AAAAHHNzaC1yc2EtY2VydC12MDFAb3BlbnNzaC5jb20...", "svc-deploy")?;
//! println!("{}", line);
//! # Ok::<(), ssh_pki_agent::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod authorized_key;
pub mod error;
pub mod identity;
pub mod ssh_cert;
pub mod trust_root;
pub mod validator;
pub mod x509;

#[cfg(test)]
mod testing;

pub use authorized_key::AuthorizedKeyLine;
pub use error::{Error, Result, Stage};
pub use identity::RequestedIdentity;
pub use ssh_cert::{CertificateType, SshCertificate};
pub use trust_root::{TrustRootPool, VerificationMode};
pub use validator::{validate_certificate, CertificateValidator};
pub use x509::{EmbeddedX509Payload, X509Identity};
