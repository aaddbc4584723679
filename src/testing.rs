//! Certificate builders shared by the unit and integration tests
//!
//! Integration tests pull this file in through `tests/common/mod.rs`.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
};
use ssh_key::certificate::{Builder, CertType};
use ssh_key::rand_core::OsRng;
use ssh_key::{Algorithm, PrivateKey, PublicKey};
use std::io::Write;
use tempfile::NamedTempFile;

/// PKCS#8 RSA key used for RSA X.509 subjects
pub const RSA_KEY_PEM: &str = include_str!("../tests/fixtures/svc_deploy_key.pem");

/// OpenSSH encoding of the public half of `RSA_KEY_PEM`
pub const RSA_KEY_OPENSSH: &str = include_str!("../tests/fixtures/svc_deploy_key.ssh.pub");

/// Root CA that issued the X.509 certificate inside the ssh-keygen fixtures
pub const FIXTURE_ROOT_CA_PEM: &str = include_str!("../tests/fixtures/fixture_root_ca.pem");

/// `ssh-keygen -s` output without `-V`, valid forever
pub const FOREVER_CERTIFICATE: &str =
    include_str!("../tests/fixtures/svc_deploy_forever-cert.pub");

/// `ssh-keygen -s -V 20200101:20991231` output
pub const BOUNDED_CERTIFICATE: &str =
    include_str!("../tests/fixtures/svc_deploy_bounded-cert.pub");

/// Key id stamped on every generated SSH certificate
pub const SSH_KEY_ID: &str = "ssh-pki-agent-test";

/// 9999-12-31T23:59:59Z
const FAR_FUTURE: u64 = 253_402_300_799;

/// Base64 body of an OpenSSH certificate line
pub fn certificate_body(line: &str) -> &str {
    line.split_whitespace().nth(1).unwrap()
}

/// Expected output for an X.509 certificate built on `RSA_KEY_PEM`
pub fn expected_rsa_line() -> String {
    format!("cert-authority {}", RSA_KEY_OPENSSH.trim())
}

pub fn rsa_subject_key() -> PublicKey {
    PublicKey::from_openssh(RSA_KEY_OPENSSH.trim()).unwrap()
}

fn sign_ssh_certificate(subject: &PublicKey, extensions: &[(&str, &str)]) -> String {
    let ca = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
    let mut builder =
        Builder::new_with_random_nonce(&mut OsRng, subject.key_data().clone(), 0, FAR_FUTURE)
            .unwrap();
    builder
        .cert_type(CertType::User)
        .unwrap()
        .key_id(SSH_KEY_ID)
        .unwrap()
        .valid_principal("svc-deploy")
        .unwrap();
    for (name, value) in extensions {
        builder.extension(*name, *value).unwrap();
    }

    let cert = builder.sign(&ca).unwrap();
    certificate_body(&cert.to_openssh().unwrap()).to_string()
}

/// Base64 body of an RSA SSH user certificate carrying `extensions`
pub fn ssh_certificate_blob(extensions: &[(&str, &str)]) -> String {
    sign_ssh_certificate(&rsa_subject_key(), extensions)
}

/// Base64 body of an Ed25519 SSH user certificate carrying `extensions`
pub fn ed25519_certificate_blob(extensions: &[(&str, &str)]) -> String {
    let subject = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
    sign_ssh_certificate(subject.public_key(), extensions)
}

/// Base64 body of an RSA SSH certificate embedding `x509_der`
pub fn ssh_certificate_with_x509(x509_der: &[u8]) -> String {
    let encoded = STANDARD.encode(x509_der);
    ssh_certificate_blob(&[("x509", encoded.as_str()), ("permit-pty", "")])
}

fn subject_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::OrganizationName, "ssh-pki-agent tests");
    name.push(DnType::CommonName, common_name);
    name
}

pub fn leaf_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new());
    params.distinguished_name = subject_name(common_name);
    params
}

pub fn rsa_leaf_params(common_name: &str) -> CertificateParams {
    let mut params = leaf_params(common_name);
    params.alg = &rcgen::PKCS_RSA_SHA256;
    params.key_pair = Some(KeyPair::from_pem(RSA_KEY_PEM).unwrap());
    params
}

/// Self-signed certificate, DER encoded
pub fn self_signed(params: CertificateParams) -> Vec<u8> {
    Certificate::from_params(params)
        .unwrap()
        .serialize_der()
        .unwrap()
}

/// Write PEM text to a temporary bundle file
pub fn pem_file(pem: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(pem.as_bytes()).unwrap();
    file
}

/// A throwaway certificate authority
pub struct TestCa {
    cert: Certificate,
}

impl TestCa {
    pub fn new(common_name: &str) -> Self {
        let mut params = leaf_params(common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        TestCa {
            cert: Certificate::from_params(params).unwrap(),
        }
    }

    pub fn pem(&self) -> String {
        self.cert.serialize_pem().unwrap()
    }

    /// The CA certificate as a PEM bundle on disk
    pub fn bundle(&self) -> NamedTempFile {
        pem_file(&self.pem())
    }

    /// Issue a leaf certificate, DER encoded
    pub fn issue(&self, params: CertificateParams) -> Vec<u8> {
        Certificate::from_params(params)
            .unwrap()
            .serialize_der_with_signer(&self.cert)
            .unwrap()
    }
}
