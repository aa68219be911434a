//! Data node TCP server: one `tokio::spawn`ed task per accepted
//! connection, requests on a connection served strictly in order
//! (spec.md §5's FIFO-per-connection guarantee), serialized across
//! connections only through [`NodeState`]'s mutex.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::error::{CResult, Error};
use crate::node::handler::dispatch;
use crate::node::state::NodeState;
use crate::protocol::MessageStream;

/// Accepts connections on `listener` forever, serving each with `state`.
pub async fn run(listener: TcpListener, state: Arc<NodeState>) -> CResult<()> {
    log::info!("data node listening on {}", listener.local_addr()?);
    loop {
        let (socket, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            log::debug!("accepted connection from {peer}");
            if let Err(e) = serve_connection(socket, &state).await {
                log::debug!("connection {peer} ended: {e}");
            }
        });
    }
}

async fn serve_connection(socket: TcpStream, state: &NodeState) -> CResult<()> {
    let mut stream = MessageStream::new(socket);
    loop {
        let request = match stream.read_message().await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()), // peer closed cleanly
            Err(Error::Codec(msg)) | Err(Error::Protocol(msg)) => {
                // malformed request: reply with an error and keep the
                // connection open (spec.md §7's "Protocol" error kind).
                stream
                    .write_message(&crate::protocol::Reply::error(msg))
                    .await?;
                continue;
            }
            Err(e) => return Err(e), // transport failure: end the connection
        };

        let reply = dispatch(state, request);
        stream.write_message(&reply).await?;
    }
}
