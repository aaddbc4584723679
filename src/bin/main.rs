use anyhow::Context;
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use ssh_pki_agent::{CertificateValidator, VerificationMode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Validate an SSH certificate carrying an X.509 identity and print a
/// cert-authority line for it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Certificate to validate (base64 body, without the key type)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    certificate: String,

    /// Requested user
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    user: String,

    /// Path of the root CA bundle to validate the certificate against
    #[arg(long, alias = "rootCA", env = "SSH_PKI_AGENT_ROOT_CA")]
    root_ca: Option<PathBuf>,
}

fn run(args: &Args) -> anyhow::Result<String> {
    let mode = VerificationMode::from_root_path(args.root_ca.as_deref())?;
    let validator = CertificateValidator::new(mode);

    let line = validator
        .validate(&args.certificate, args.user.as_str())
        .with_context(|| format!("rejected certificate for '{}'", args.user))?;

    Ok(line.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Keep the stage diagnostic on one line
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
