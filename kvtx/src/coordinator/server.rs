//! Coordinator TCP server: mirrors [`crate::node::server`]'s shape, but
//! each accepted connection shares one [`Coordinator`] guarded by its own
//! internal async locks rather than a single `std::sync::Mutex`, since a
//! commit's critical section spans `.await` points (node PUT calls).

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::coordinator::handler::dispatch;
use crate::coordinator::state::Coordinator;
use crate::error::{CResult, Error};
use crate::protocol::MessageStream;

pub async fn run(listener: TcpListener, coordinator: Arc<Coordinator>) -> CResult<()> {
    log::info!("coordinator listening on {}", listener.local_addr()?);
    loop {
        let (socket, peer) = listener.accept().await?;
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            log::debug!("accepted connection from {peer}");
            if let Err(e) = serve_connection(socket, &coordinator).await {
                log::debug!("connection {peer} ended: {e}");
            }
        });
    }
}

async fn serve_connection(socket: TcpStream, coordinator: &Coordinator) -> CResult<()> {
    let mut stream = MessageStream::new(socket);
    loop {
        let request = match stream.read_message().await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(Error::Codec(msg)) | Err(Error::Protocol(msg)) => {
                stream.write_message(&crate::protocol::Reply::error(msg)).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let reply = dispatch(coordinator, request).await;
        stream.write_message(&reply).await?;
    }
}
