//! trustgate: administer user certificate trust decisions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use trustgate_crypto::{display_fingerprint, fingerprint};
use trustgate_manager::{
    ManagerConfig, PolicyDecisionProvider, TrustManager, Verdict, DEFAULT_AUTH_TYPE,
};
use trustgate_tls::{load_certificate_file, WebPkiSystemTrust};
use trustgate_types::Certificate;
use trustgate_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "trustgate", about = "Inspect and edit user certificate trust decisions")]
struct Cli {
    /// Directory of the trusted-certificate store.
    #[arg(long, env = "TRUSTGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Don't accept certificates on the strength of the system roots alone.
    #[arg(long, env = "TRUSTGATE_NO_SYSTEM_ROOTS")]
    no_system_roots: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "TRUSTGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TRUSTGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TRUSTGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// List the fingerprints of all user-trusted certificates.
    List,
    /// Trust a certificate (PEM or DER; the first certificate of a chain).
    Trust { file: PathBuf },
    /// Remove a certificate from the trusted set.
    Distrust { file: PathBuf },
    /// Forget every trust decision.
    Clear,
    /// Print the fingerprints of a certificate.
    Fingerprint { file: PathBuf },
    /// Evaluate a certificate chain without asking anyone.
    Check { file: PathBuf },
}

/// File config (or defaults) with command line overrides applied.
fn resolve_config(cli: &Cli) -> anyhow::Result<ManagerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = ManagerConfig::from_toml_file(path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => ManagerConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if cli.no_system_roots {
        config.trust_system_roots = false;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    // The command line never has anyone to ask.
    config.interactive = false;
    Ok(config)
}

fn leaf_from(path: &Path) -> anyhow::Result<Certificate> {
    let mut chain = load_chain(path)?;
    Ok(chain.swap_remove(0))
}

fn load_chain(path: &Path) -> anyhow::Result<Vec<Certificate>> {
    load_certificate_file(path).with_context(|| format!("reading {}", path.display()))
}

fn open_manager(config: &ManagerConfig) -> anyhow::Result<TrustManager> {
    let system = Arc::new(WebPkiSystemTrust::with_webpki_roots()?);
    TrustManager::open(config, system, Arc::new(PolicyDecisionProvider::reject_all()))
        .with_context(|| format!("opening trust store in {}", config.data_dir.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match &cli.command {
        Command::List => {
            let manager = open_manager(&config)?;
            let trusted = manager.store().trusted_certificates();
            for cert in &trusted {
                println!("{}", fingerprint(cert));
            }
            tracing::info!(count = trusted.len(), "listed user-trusted certificates");
        }
        Command::Trust { file } => {
            let cert = leaf_from(file)?;
            let manager = open_manager(&config)?;
            manager.store().try_set_trusted(&cert)?;
            println!("trusted {}", fingerprint(&cert));
        }
        Command::Distrust { file } => {
            let cert = leaf_from(file)?;
            let manager = open_manager(&config)?;
            manager.store().try_set_distrusted(&cert)?;
            println!("removed {}", fingerprint(&cert));
        }
        Command::Clear => {
            let manager = open_manager(&config)?;
            let count = manager.store().trusted_count();
            manager.reset_certificates()?;
            println!("cleared {count} trusted certificate(s)");
        }
        Command::Fingerprint { file } => {
            let cert = leaf_from(file)?;
            println!("SHA-512: {}", fingerprint(&cert));
            println!("SHA-256: {}", display_fingerprint(&cert));
        }
        Command::Check { file } => {
            let chain = load_chain(file)?;
            let manager = open_manager(&config)?;
            let verdict = manager.explain(&chain, DEFAULT_AUTH_TYPE)?;
            let line = match verdict {
                Verdict::Accept(basis) => format!("accepted: {basis}"),
                Verdict::Reject(basis) => format!("rejected: {basis}"),
                Verdict::NeedsDecision(_) => "rejected: needs a user decision".to_string(),
            };
            println!("{} {}", fingerprint(&chain[0]).short(), line);
        }
    }

    Ok(())
}
