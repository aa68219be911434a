//! Thin driver for a data node: parses CLI args, binds a socket, and hands
//! off to `kvtx::node::server::run`. Carries no business logic of its own.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use kvtx::error::CResult;
use kvtx::node::{server, NodeState};

#[derive(Parser, Debug)]
#[command(about = "Data node: stores key-value pairs and grants per-key locks")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 7001)]
    port: u16,
}

#[tokio::main]
async fn main() -> CResult<()> {
    kvtx::logging::init();
    let args = Args::parse();
    log::info!("data node starting with args: {args:?}");

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("--host/--port must form a valid socket address");

    let listener = TcpListener::bind(addr).await?;
    let state = Arc::new(NodeState::new());
    server::run(listener, state).await
}
