//! End-to-end round-trip against a real `kvtx::node::server` accepting
//! connections on an OS-assigned port.

use std::sync::Arc;

use kvtx::node::{server, NodeState};
use kvtx::protocol::{MessageStream, Reply, Request, TxId};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_node() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(NodeState::new());
    tokio::spawn(async move {
        server::run(listener, state).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn put_then_get_round_trips_over_the_wire() {
    let addr = spawn_node().await;
    let mut stream = MessageStream::new(TcpStream::connect(addr).await.unwrap());

    stream
        .write_message(&Request::Put { key: "k".to_string(), value: "v".to_string(), tx_id: None })
        .await
        .unwrap();
    assert_eq!(stream.read_message::<Reply>().await.unwrap(), Some(Reply::ok()));

    stream.write_message(&Request::Get { key: "k".to_string() }).await.unwrap();
    assert_eq!(stream.read_message::<Reply>().await.unwrap(), Some(Reply::ok_value(Some("v".to_string()))));
}

#[tokio::test]
async fn lock_contention_is_visible_across_connections() {
    let addr = spawn_node().await;
    let mut a = MessageStream::new(TcpStream::connect(addr).await.unwrap());
    let mut b = MessageStream::new(TcpStream::connect(addr).await.unwrap());

    a.write_message(&Request::Lock { key: "row".to_string(), tx_id: TxId(1) }).await.unwrap();
    assert_eq!(a.read_message::<Reply>().await.unwrap(), Some(Reply::ok()));

    b.write_message(&Request::Lock { key: "row".to_string(), tx_id: TxId(2) }).await.unwrap();
    assert_eq!(b.read_message::<Reply>().await.unwrap(), Some(Reply::Locked { owner: TxId(1) }));
}

#[tokio::test]
async fn malformed_frame_gets_error_reply_and_connection_stays_open() {
    let addr = spawn_node().await;
    let mut stream = MessageStream::new(TcpStream::connect(addr).await.unwrap());

    // manually write a frame whose payload is not valid JSON for any Request.
    let bogus = b"not json";
    let len = (bogus.len() as u32).to_be_bytes();
    use tokio::io::AsyncWriteExt;
    stream.get_mut().write_all(&len).await.unwrap();
    stream.get_mut().write_all(bogus).await.unwrap();

    let reply = stream.read_message::<Reply>().await.unwrap().unwrap();
    assert!(matches!(reply, Reply::Error { .. }));

    // connection is still usable afterwards.
    stream.write_message(&Request::Get { key: "k".to_string() }).await.unwrap();
    assert_eq!(stream.read_message::<Reply>().await.unwrap(), Some(Reply::ok_value(None)));
}
