#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use hashirama_api::{ChainGateway, GatewayConfig};
use hashirama_kubehub::KubeResourceClient;

#[derive(Parser, Debug)]
#[command(name = "hashiramad", version, about = "Hashirama chain lifecycle gateway")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "HASHIRAMA_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
    /// Namespace holding the chains
    #[arg(long, env = "HASHIRAMA_NAMESPACE", default_value = "default")]
    namespace: String,
    /// Per-call orchestrator timeout
    #[arg(long = "timeout-secs", env = "HASHIRAMA_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
    /// Kubeconfig context (defaults to current)
    #[arg(long, env = "HASHIRAMA_KUBE_CONTEXT")]
    context: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let client = KubeResourceClient::connect(cli.context.as_deref(), Duration::from_secs(cli.timeout_secs)).await?;
    let gateway = ChainGateway::new(Arc::new(client), GatewayConfig { namespace: cli.namespace });
    hashirama_server::serve(cli.listen, gateway).await
}

fn init_tracing() {
    let env = std::env::var("HASHIRAMA_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HASHIRAMA_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<SocketAddr>() {
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
