mod config;

pub use config::DelayConfig;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::NodeExecutor;
use crate::engine::types::{Connection, PayloadMap, RunStatus, SerializedNode};
use crate::nodes::NodeRegistry;

#[derive(Parser)]
#[command(name = "ironflow-delay", version, about = "Delay pass-through node for ironflow graphs")]
pub struct Cli {
    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    dotenv: Option<PathBuf>,

    /// Path to a config file (default: auto-detect ironflow-delay.yaml in cwd)
    #[arg(long, global = true, env = "IRONFLOW_DELAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available nodes
    Nodes,

    /// Print a new node of the given type as JSON
    Create {
        /// Node type tag (e.g. "delay")
        node_type: String,
    },

    /// Print the port definitions of a node for a connection set
    Ports {
        /// Path to the serialized node JSON
        #[arg(long)]
        node: PathBuf,

        /// Path to a JSON array of connections
        #[arg(long)]
        connections: Option<PathBuf>,
    },

    /// Execute a node once against a payload
    Run {
        /// Path to the serialized node JSON
        #[arg(long)]
        node: PathBuf,

        /// Input payload as JSON object (e.g. '{"input1": "a"}')
        #[arg(short, long)]
        payload: Option<String>,

        /// Abort the run after this many milliseconds
        #[arg(long, env = "IRONFLOW_DELAY_TIMEOUT_MS")]
        timeout_ms: Option<u64>,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file
    load_dotenv(cli.dotenv.as_deref());

    let config = DelayConfig::load(cli.config.as_deref())?;
    let pretty = config.format.as_deref() != Some("json");

    match cli.command {
        Commands::Nodes => cmd_nodes(),
        Commands::Create { node_type } => cmd_create(&node_type, pretty),
        Commands::Ports { node, connections } => {
            cmd_ports(&node, connections.as_deref(), pretty)
        }
        Commands::Run {
            node,
            payload,
            timeout_ms,
        } => cmd_run(&node, payload, timeout_ms.or(config.timeout_ms), pretty).await,
    }
}

/// Load environment variables from a .env file.
/// If an explicit path is given, load from that path (warn if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
fn load_dotenv(explicit_path: Option<&Path>) {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => info!("Loaded env from {}", path.display()),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => info!("Loaded env from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => {}
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
            }
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn read_node(path: &Path) -> Result<SerializedNode> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read node file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse node file: {}", path.display()))
}

fn read_connections(path: Option<&Path>) -> Result<Vec<Connection>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connections file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse connections file: {}", path.display()))
}

fn cmd_nodes() -> Result<()> {
    let registry = NodeRegistry::with_builtins();

    println!("{:<16} {:<16} {:<12} INFO", "TYPE", "TITLE", "GROUP");
    println!("{}", "-".repeat(72));
    for (node_type, title) in registry.list() {
        if let Some(def) = registry.get(node_type) {
            let ui = def.ui_data();
            println!(
                "{:<16} {:<16} {:<12} {}",
                node_type,
                title,
                ui.group.join("/"),
                ui.info_box_body
            );
        }
    }
    Ok(())
}

fn cmd_create(node_type: &str, pretty: bool) -> Result<()> {
    let registry = NodeRegistry::with_builtins();
    let node = registry.create(node_type)?;
    print_json(&node, pretty)
}

fn cmd_ports(node_path: &Path, connections_path: Option<&Path>, pretty: bool) -> Result<()> {
    let registry = NodeRegistry::with_builtins();
    let node = registry.instantiate(&read_node(node_path)?)?;
    let connections = read_connections(connections_path)?;

    let ports = serde_json::json!({
        "inputs": node.input_definitions(&connections),
        "outputs": node.output_definitions(&connections),
        "body": node.body(),
    });
    print_json(&ports, pretty)
}

async fn cmd_run(
    node_path: &Path,
    payload_json: Option<String>,
    timeout_ms: Option<u64>,
    pretty: bool,
) -> Result<()> {
    let registry = NodeRegistry::with_builtins();
    let node = registry.instantiate(&read_node(node_path)?)?;

    let inputs: PayloadMap = match payload_json {
        Some(json) => {
            serde_json::from_str(&json).with_context(|| "Failed to parse --payload JSON")?
        }
        None => PayloadMap::new(),
    };

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let executor = NodeExecutor::with_timeout(timeout_ms.map(Duration::from_millis));
    let run = executor.run(node.as_ref(), inputs, &cancel).await;

    match run.status {
        RunStatus::Success => print_json(&run.output.unwrap_or_default(), pretty),
        RunStatus::Cancelled => anyhow::bail!("Node '{}' cancelled", run.node_id),
        _ => anyhow::bail!(
            "Node '{}' failed: {}",
            run.node_id,
            run.error.unwrap_or_default()
        ),
    }
}
