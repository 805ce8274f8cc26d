use std::sync::mpsc as std_mpsc;

use pingball_shared::config::QUEUE_CAPACITY;
use pingball_shared::protocol::{ClientMsg, ServerMsg};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::NetError;

type CmdSender = mpsc::UnboundedSender<ClientMsg>;

/// Handle to the network thread. Dropping it closes the outbound side,
/// which ends the thread.
pub struct ServerConnection {
    cmd_tx: CmdSender,
}

impl ServerConnection {
    /// Connects to `addr`, registers `name` and waits for `START`.
    ///
    /// Returns the handle plus the queue the network thread fills with
    /// server messages.
    pub fn connect(
        addr: String,
        name: &str,
    ) -> Result<(Self, mpsc::Receiver<ServerMsg>), NetError> {
        let (inbox_tx, inbox_rx) = mpsc::channel::<ServerMsg>(QUEUE_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMsg>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), NetError>>();
        let name = name.to_string();

        std::thread::Builder::new()
            .name("pingball-net".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_io()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(NetError::Runtime(e.to_string())));
                        return;
                    }
                };
                rt.block_on(run_connection(addr, name, inbox_tx, cmd_rx, ready_tx));
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok((Self { cmd_tx }, inbox_rx)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NetError::Closed),
        }
    }

    pub fn send(&self, msg: ClientMsg) {
        if self.cmd_tx.send(msg).is_err() {
            debug!("network thread gone; dropping outbound message");
        }
    }
}

async fn write_line(write: &mut OwnedWriteHalf, msg: &ClientMsg) -> std::io::Result<()> {
    write.write_all(format!("{msg}\n").as_bytes()).await
}

async fn handshake(
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    write: &mut OwnedWriteHalf,
    name: &str,
) -> Result<(), NetError> {
    write_line(write, &ClientMsg::Name(name.to_string())).await?;
    loop {
        let Some(text) = lines.next_line().await? else {
            return Err(NetError::Closed);
        };
        match text.parse::<ServerMsg>() {
            Ok(ServerMsg::Start) => return Ok(()),
            Ok(ServerMsg::Reject(reason)) => return Err(NetError::Rejected(reason)),
            Ok(other) => debug!(msg = %other, "ignoring message before START"),
            Err(e) => warn!(error = %e, line = %text, "malformed line from server"),
        }
    }
}

async fn run_connection(
    addr: String,
    name: String,
    inbox_tx: mpsc::Sender<ServerMsg>,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMsg>,
    ready_tx: std_mpsc::Sender<Result<(), NetError>>,
) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }
    };
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    if let Err(e) = handshake(&mut lines, &mut write, &name).await {
        let _ = ready_tx.send(Err(e));
        return;
    }
    info!(%addr, board = %name, "connected");
    let _ = ready_tx.send(Ok(()));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    break;
                };
                if let Err(e) = write_line(&mut write, &msg).await {
                    warn!(error = %e, "failed to send to server");
                    break;
                }
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => match text.parse::<ServerMsg>() {
                        Ok(msg) => {
                            if inbox_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, line = %text, "malformed line from server"),
                    },
                    Ok(None) => {
                        info!("server closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "connection to server lost");
                        break;
                    }
                }
            }
        }
    }
}
