mod common;

use common::TestCa;
use std::process::{Command, Output};

fn agent(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ssh-pki-agent"))
        .args(args)
        .env_remove("SSH_PKI_AGENT_ROOT_CA")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn svc_deploy_certificate() -> String {
    common::ssh_certificate_with_x509(&common::self_signed(common::rsa_leaf_params("svc-deploy")))
}

#[test]
fn prints_cert_authority_line() {
    let blob = svc_deploy_certificate();

    let output = agent(&["--certificate", &blob, "--user", "svc-deploy"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        format!("{}\n", common::expected_rsa_line())
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn accepts_ssh_keygen_certificate_valid_forever() {
    let bundle = common::pem_file(common::FIXTURE_ROOT_CA_PEM);
    let blob = common::certificate_body(common::FOREVER_CERTIFICATE);
    let root = bundle.path().to_str().unwrap();

    let output = agent(&["--certificate", blob, "--user", "svc-deploy", "--root-ca", root]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        format!("{}\n", common::expected_rsa_line())
    );

    let output = agent(&["--certificate", blob, "--user", "svc-other", "--root-ca", root]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn mismatched_user_names_both_identities() {
    let blob = svc_deploy_certificate();

    let output = agent(&["--certificate", &blob, "--user", "svc-other"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1, "{stderr}");
    assert!(stderr.contains("svc-deploy"));
    assert!(stderr.contains("svc-other"));
}

#[test]
fn verifies_against_root_ca() {
    let ca = TestCa::new("Deploy Root CA");
    let bundle = ca.bundle();
    let blob = common::ssh_certificate_with_x509(&ca.issue(common::rsa_leaf_params("svc-deploy")));
    let root = bundle.path().to_str().unwrap();

    let output = agent(&["--certificate", &blob, "--user", "svc-deploy", "--root-ca", root]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().trim_end(),
        common::expected_rsa_line()
    );

    // Legacy flag spelling
    let output = agent(&["--certificate", &blob, "--user", "svc-deploy", "--rootCA", root]);
    assert!(output.status.success());
}

#[test]
fn rejects_certificate_outside_root_ca() {
    let trusted = TestCa::new("Deploy Root CA");
    let bundle = trusted.bundle();
    let blob = svc_deploy_certificate();
    let root = bundle.path().to_str().unwrap();

    let output = agent(&["--certificate", &blob, "--user", "svc-deploy", "--root-ca", root]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Failed to verify X509 certificate"));
}

#[test]
fn root_ca_from_environment() {
    let trusted = TestCa::new("Deploy Root CA");
    let bundle = trusted.bundle();
    let blob = svc_deploy_certificate();

    let output = Command::new(env!("CARGO_BIN_EXE_ssh-pki-agent"))
        .args(["--certificate", blob.as_str(), "--user", "svc-deploy"])
        .env("SSH_PKI_AGENT_ROOT_CA", bundle.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_root_file() {
    let blob = svc_deploy_certificate();

    let output = agent(&[
        "--certificate",
        &blob,
        "--user",
        "svc-deploy",
        "--root-ca",
        "/nonexistent/ssh-pki-agent/roots.pem",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Unable to read root CA"));
}

#[test]
fn requires_certificate_and_user() {
    assert!(!agent(&["--user", "svc-deploy"]).status.success());
    assert!(!agent(&["--certificate", "AAAA"]).status.success());
    assert!(!agent(&["--certificate", "", "--user", "svc-deploy"]).status.success());
    assert!(!agent(&["--certificate", "AAAA", "--user", ""]).status.success());
}

#[test]
fn undecodable_certificate() {
    let output = agent(&["--certificate", "definitely-not-base64", "--user", "svc-deploy"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Failed to parse certificate"));
}
