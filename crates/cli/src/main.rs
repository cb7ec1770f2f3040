#![forbid(unsafe_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use hashirama_api::{ChainGateway, GatewayConfig};
use hashirama_core::{ChainRecord, ChainRequest, MadaraChain};
use hashirama_kubehub::KubeResourceClient;
use kube::CustomResourceExt;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hashiramactl", version, about = "Hashirama CLI: MadaraChain lifecycle")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Namespace holding the chains
    #[arg(long = "ns", global = true, env = "HASHIRAMA_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Kubeconfig context (default: current)
    #[arg(long = "context", global = true, env = "HASHIRAMA_KUBE_CONTEXT")]
    context: Option<String>,

    /// Per-call orchestrator timeout
    #[arg(long = "timeout-secs", global = true, env = "HASHIRAMA_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List chains with their health
    Ls,
    /// Show one chain
    Get {
        name: String,
    },
    /// Create a chain
    Create {
        #[arg(long)]
        name: String,
        /// Chain identifier, e.g. "SN_L3_1"
        #[arg(long = "chain-id")]
        chain_id: String,
        /// Desired node count (non-positive means 1)
        #[arg(long, allow_negative_numbers = true)]
        replicas: Option<i64>,
    },
    /// Request deletion of a chain
    Delete {
        name: String,
    },
    /// Print the MadaraChain CustomResourceDefinition as YAML
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    if let Commands::Crd = cli.command {
        print!("{}", serde_yaml::to_string(&MadaraChain::crd())?);
        return Ok(());
    }

    let client = KubeResourceClient::connect(cli.context.as_deref(), Duration::from_secs(cli.timeout_secs)).await?;
    let gw = ChainGateway::new(Arc::new(client), GatewayConfig { namespace: cli.namespace.clone() });

    match cli.command {
        Commands::Ls => {
            info!(ns = %gw.namespace(), "ls invoked");
            let records = gw.list().await?;
            match cli.output {
                Output::Human => {
                    println!("{}", header());
                    let now = Utc::now();
                    for r in &records {
                        println!("{}", row(r, now));
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }
        Commands::Get { name } => {
            info!(ns = %gw.namespace(), name = %name, "get invoked");
            let record = gw.get(&name).await?;
            match cli.output {
                Output::Human => {
                    println!("{}", header());
                    println!("{}", row(&record, Utc::now()));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&record)?),
            }
        }
        Commands::Create { name, chain_id, replicas } => {
            info!(ns = %gw.namespace(), name = %name, chain_id = %chain_id, "create invoked");
            let created = gw.create(ChainRequest { name, chain_id, replicas, port: None }).await?;
            match cli.output {
                Output::Human => println!(
                    "madarachain/{} created (chainID={}, replicas={}, port={})",
                    created.metadata.name.as_deref().unwrap_or(""),
                    created.spec.chain_id,
                    created.spec.replicas,
                    created.spec.port
                ),
                Output::Json => println!("{}", serde_json::to_string_pretty(&created)?),
            }
        }
        Commands::Delete { name } => {
            info!(ns = %gw.namespace(), name = %name, "delete invoked");
            let ack = gw.delete(&name).await?;
            match cli.output {
                Output::Human => println!("madarachain/{} deletion requested", name),
                Output::Json => println!("{}", serde_json::to_string_pretty(&ack)?),
            }
        }
        Commands::Crd => {}
    }

    Ok(())
}

fn header() -> String {
    format!("{:<24} {:<16} {:>8} {:>8} {:<14} {}", "NAME", "CHAINID", "REPLICAS", "RUNNING", "HEALTH", "AGE")
}

fn row(r: &ChainRecord, now: DateTime<Utc>) -> String {
    let running = r.nodes_running().map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    let age = r.chain.metadata.creation_timestamp.as_ref().map(|t| render_age(t.0, now)).unwrap_or_else(|| "-".to_string());
    format!(
        "{:<24} {:<16} {:>8} {:>8} {:<14} {}",
        r.name(),
        r.chain.spec.chain_id,
        r.chain.spec.replicas,
        running,
        r.health,
        age
    )
}

fn render_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mut secs = now.signed_duration_since(created).num_seconds().max(0) as u64;
    let days = secs / 86_400; secs %= 86_400;
    let hours = secs / 3600; secs %= 3600;
    let mins = secs / 60; secs %= 60;
    if days > 0 { format!("{}d{}h", days, hours) }
    else if hours > 0 { format!("{}h{}m", hours, mins) }
    else if mins > 0 { format!("{}m", mins) }
    else { format!("{}s", secs) }
}

fn init_tracing() {
    let env = std::env::var("HASHIRAMA_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HASHIRAMA_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid HASHIRAMA_METRICS_ADDR; expected host:port");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hashirama_core::{ChainHealth, MadaraChainSpec, MadaraChainStatus};

    #[test]
    fn age_buckets() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(render_age(t0, t0 + chrono::Duration::seconds(42)), "42s");
        assert_eq!(render_age(t0, t0 + chrono::Duration::minutes(5)), "5m");
        assert_eq!(render_age(t0, t0 + chrono::Duration::minutes(125)), "2h5m");
        assert_eq!(render_age(t0, t0 + chrono::Duration::hours(50)), "2d2h");
        // clock skew never goes negative
        assert_eq!(render_age(t0, t0 - chrono::Duration::seconds(10)), "0s");
    }

    #[test]
    fn row_shows_dash_for_missing_status() {
        let chain = MadaraChain::new("alpha", MadaraChainSpec::with_defaults("SN_L3_1", Some(3)));
        let r = ChainRecord { chain, health: ChainHealth::NotReconciled };
        let line = row(&r, Utc::now());
        assert!(line.starts_with("alpha"));
        assert!(line.contains("SN_L3_1"));
        assert!(line.contains("NotReconciled"));
        assert!(line.trim_end().ends_with('-'));

        let mut chain = MadaraChain::new("beta", MadaraChainSpec::with_defaults("SN", Some(3)));
        chain.status = Some(MadaraChainStatus { nodes_running: Some(3), ..Default::default() });
        let r = ChainRecord { chain, health: ChainHealth::Healthy };
        assert!(row(&r, Utc::now()).contains("Healthy"));
    }
}
