use std::time::Duration;

use pingball_shared::protocol::{ClientMsg, ServerMsg};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::router::RouterCommand;
use crate::state::ConnId;

/// Accept loop: one task per client connection.
pub async fn accept_loop(
    listener: TcpListener,
    router_tx: mpsc::Sender<RouterCommand>,
    outbound_capacity: usize,
) {
    let mut next_conn: ConnId = 1;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let conn = next_conn;
                next_conn += 1;
                tracing::debug!(conn, %peer, "client connected");
                tokio::spawn(handle_connection(
                    stream,
                    conn,
                    router_tx.clone(),
                    outbound_capacity,
                ));
            }
            Err(e) => {
                tracing::warn!("accept failed: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Runs one client: a writer task drains the outbound queue while this
/// task reads lines and hands them to the router.
pub async fn handle_connection(
    stream: TcpStream,
    conn: ConnId,
    router_tx: mpsc::Sender<RouterCommand>,
    outbound_capacity: usize,
) {
    let (read, mut write) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(outbound_capacity);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = write.write_all(format!("{msg}\n").as_bytes()).await {
                tracing::debug!(conn, "write failed: {e}");
                break;
            }
        }
    });

    let mut lines = BufReader::new(read).lines();
    loop {
        let text = match lines.next_line().await {
            Ok(Some(text)) => text,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(conn, "read failed: {e}");
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        let cmd = match text.parse::<ClientMsg>() {
            Ok(ClientMsg::Name(name)) => RouterCommand::Register {
                conn,
                name,
                outbound: out_tx.clone(),
            },
            Ok(ClientMsg::Ball { ball, target }) => RouterCommand::Ball {
                from: conn,
                ball,
                target,
            },
            Err(e) => {
                tracing::warn!(conn, line = %text, "ignoring malformed line: {e}");
                continue;
            }
        };
        if router_tx.send(cmd).await.is_err() {
            tracing::error!("router is gone");
            break;
        }
    }

    let _ = router_tx.send(RouterCommand::Disconnect { conn }).await;
    drop(out_tx);
    writer.abort();
    tracing::debug!(conn, "client disconnected");
}
