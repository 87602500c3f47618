//! Networktools binary entrypoint.
//!
//! The per-node control agent: `init` enrolls with the controller once,
//! `run` starts the standing reconciliation service loop.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use tracing::info;

use networktools::error::NetworktoolsError;

/// Networktools - overlay mesh node agent.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "networktools")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Enrolls this node with the controller and persists its settings.
    Init {
        /// Directory holding this node's persistent state file.
        #[arg(short = 'd', long, env = "NETWORKTOOLS_DATA_DIR")]
        data_dir: PathBuf,
        /// Linux network namespace this node will manage.
        #[arg(long, env = "NETWORKTOOLS_NAMESPACE")]
        namespace: String,
        /// Host uplink interface used for exit-node masquerading.
        #[arg(long, env = "NETWORKTOOLS_ETH_NAME")]
        eth_name: String,
        /// Base URL of the controller API.
        #[arg(long, env = "NETWORKTOOLS_CONTROLLER")]
        domain_prefix: String,
    },
    /// Runs the standing reconciliation service loop.
    Run {
        /// Directory holding this node's persistent state file.
        #[arg(short = 'd', long, env = "NETWORKTOOLS_DATA_DIR")]
        data_dir: PathBuf,
        /// Directory the relay worker's `gost` binary is installed under.
        #[arg(long, env = "INSTALL_DIR", default_value = "/opt/networktools")]
        install_dir: String,
    },
}

fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("networktools-state.json")
}

/// Initialize tracing/logging based on verbosity.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("networktools=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("networktools=info,warn"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_thread_ids(false).init();
}

async fn run_init(data_dir: &Path, namespace: &str, eth_name: &str, domain_prefix: &str) -> Result<(), NetworktoolsError> {
    let store = netctl_store::NodeStore::open(store_path(data_dir))?;

    let signing_key = SigningKey::generate(&mut OsRng);
    let private_key_hex = hex::encode(signing_key.to_bytes());
    let identity = netctl_controller::identity::SigningIdentity::from_bytes(&signing_key.to_bytes());
    let client = netctl_controller::HttpControllerClient::new(domain_prefix, identity)?;

    networktools::init_flow::run_init(&client, &store, namespace, eth_name, domain_prefix, &private_key_hex).await
}

async fn run_service(data_dir: &Path, install_dir: &str) -> Result<(), NetworktoolsError> {
    let store = netctl_store::NodeStore::open(store_path(data_dir))?;
    let settings = store.get_node_settings().map_err(NetworktoolsError::MissingNodeSettings)?;

    let identity = netctl_controller::identity::SigningIdentity::from_hex(&settings.private_key)?;
    let controller = netctl_controller::HttpControllerClient::new(&settings.domain_prefix, identity)?;

    let link = netctl_link::ProcessLinkBackend;
    let container = netctl_container::ProcessContainerRuntime;
    let ping_source = netctl_ping::ProcessPingSource;
    let relay = netctl_relay::RelayManager::new(netctl_relay::SystemdSupervisor, install_dir);

    networktools::service::run(&link, &container, &ping_source, &relay, &controller, &store).await
}

async fn run(cli: Cli) -> Result<(), NetworktoolsError> {
    init_tracing(cli.verbose);
    info!("networktools starting");

    match cli.command {
        Command::Init { data_dir, namespace, eth_name, domain_prefix } => {
            run_init(&data_dir, &namespace, &eth_name, &domain_prefix).await
        }
        Command::Run { data_dir, install_dir } => run_service(&data_dir, &install_dir).await,
    }
}

fn main() {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|error| {
            eprintln!("failed to create tokio runtime: {error}");
            std::process::exit(1);
        });

    if let Err(error) = runtime.block_on(run(cli)) {
        eprintln!("networktools error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut full_args = vec!["networktools"];
        full_args.extend(args);
        Cli::try_parse_from(full_args)
    }

    #[test]
    fn parses_run_with_data_dir() {
        let cli = parse_args(&["run", "-d", "/var/lib/networktools"]).expect("should parse");
        assert_eq!(
            cli.command,
            Command::Run { data_dir: PathBuf::from("/var/lib/networktools"), install_dir: "/opt/networktools".to_string() }
        );
    }

    #[test]
    fn run_accepts_an_explicit_install_dir() {
        let cli = parse_args(&["run", "-d", "/var/lib/networktools", "--install-dir", "/srv/nt"]).expect("should parse");
        assert_eq!(
            cli.command,
            Command::Run { data_dir: PathBuf::from("/var/lib/networktools"), install_dir: "/srv/nt".to_string() }
        );
    }

    #[test]
    fn parses_init_with_all_required_fields() {
        let cli = parse_args(&[
            "init",
            "-d",
            "/var/lib/networktools",
            "--namespace",
            "netA",
            "--eth-name",
            "eth0",
            "--domain-prefix",
            "https://controller.example",
        ])
        .expect("should parse");

        assert_eq!(
            cli.command,
            Command::Init {
                data_dir: PathBuf::from("/var/lib/networktools"),
                namespace: "netA".to_string(),
                eth_name: "eth0".to_string(),
                domain_prefix: "https://controller.example".to_string(),
            }
        );
    }

    #[test]
    fn init_without_namespace_is_a_parse_error() {
        let result = parse_args(&["init", "-d", "/var/lib/networktools", "--eth-name", "eth0", "--domain-prefix", "https://x"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = parse_args(&["-v", "run", "-d", "/tmp/nt"]).expect("should parse");
        assert!(cli.verbose);
    }

    #[test]
    fn missing_subcommand_is_a_parse_error() {
        assert!(parse_args(&[]).is_err());
    }
}
