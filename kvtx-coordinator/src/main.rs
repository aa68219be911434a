//! Thin driver for the coordinator: parses CLI args (own bind address plus
//! the fixed node list), binds a socket, and hands off to
//! `kvtx::coordinator::server::run`.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use kvtx::coordinator::{server, Coordinator};
use kvtx::error::CResult;

#[derive(Parser, Debug)]
#[command(about = "Coordinator: runs OCC backward validation and routes writes to data nodes")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Comma-separated list of data node addresses, e.g. "127.0.0.1:7001,127.0.0.1:7002".
    /// Fixed for the coordinator's lifetime (no membership changes).
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> CResult<()> {
    kvtx::logging::init();
    let args = Args::parse();
    log::info!("coordinator starting with args: {args:?}");

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("--host/--port must form a valid socket address");

    let node_addrs: Vec<SocketAddr> = args
        .nodes
        .iter()
        .map(|s| s.parse().unwrap_or_else(|_| panic!("invalid --nodes entry: {s}")))
        .collect();
    assert!(!node_addrs.is_empty(), "--nodes must list at least one data node");

    let listener = TcpListener::bind(addr).await?;
    let coordinator = Arc::new(Coordinator::new(node_addrs));
    server::run(listener, coordinator).await
}
