//! Network thread tests against a scripted TCP server.

use std::time::Duration;

use pingball_client::connection::ServerConnection;
use pingball_client::error::NetError;
use pingball_shared::protocol::{BallWire, ClientMsg, Direction, ServerMsg};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn connect(addr: String, name: &'static str) -> Result<
    (ServerConnection, tokio::sync::mpsc::Receiver<ServerMsg>),
    NetError,
> {
    tokio::task::spawn_blocking(move || ServerConnection::connect(addr, name))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_then_lines_flow_both_ways() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let hello = lines.next_line().await.unwrap().unwrap();
        write
            .write_all(b"START\nMERGE R Right\nnonsense\nBALL b 1 2 3 4\n")
            .await
            .unwrap();
        let handoff = lines.next_line().await.unwrap().unwrap();
        (hello, handoff)
    });

    let (conn, mut inbox) = connect(addr, "Left").await.unwrap();

    let first = timeout(WAIT, inbox.recv()).await.unwrap().unwrap();
    assert_eq!(
        first,
        ServerMsg::Merge {
            wall: Direction::Right,
            neighbor: "Right".to_string()
        }
    );
    // The malformed line in between is skipped.
    let second = timeout(WAIT, inbox.recv()).await.unwrap().unwrap();
    assert!(matches!(second, ServerMsg::Ball(ref b) if b.name == "b" && b.vy == 4.0));

    let ball = BallWire {
        name: "b".to_string(),
        x: 1.0,
        y: 10.0,
        vx: 5.0,
        vy: 0.0,
    };
    conn.send(ClientMsg::Ball {
        ball,
        target: "Right".to_string(),
    });

    let (hello, handoff) = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(hello, "NAME Left");
    assert!(handoff.starts_with("BALL b "), "{handoff}");
    assert!(handoff.ends_with(" Right"), "{handoff}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_name_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream
            .write_all(b"REJECT Board name already exists.\n")
            .await
            .unwrap();
        // Hold the socket open until the client hangs up.
        let mut buf = Vec::new();
        let _ = tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut buf).await;
    });

    match connect(addr, "Taken").await {
        Err(NetError::Rejected(reason)) => assert_eq!(reason, "Board name already exists."),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("connection should have been rejected"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_server_is_an_io_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    assert!(matches!(connect(addr, "Lonely").await, Err(NetError::Io(_))));
}
