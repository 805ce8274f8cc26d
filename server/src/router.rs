use std::collections::HashMap;

use pingball_shared::protocol::{BallWire, Direction, MergeAxis, ServerMsg, NAME_TAKEN};
use tokio::sync::{mpsc, watch};

use crate::state::{ConnId, Notice, Registry, RegistryError, RegistrySnapshot};

/// Commands from connections and the admin console to the router
#[derive(Debug)]
pub enum RouterCommand {
    Register {
        conn: ConnId,
        name: String,
        outbound: mpsc::Sender<ServerMsg>,
    },
    Disconnect {
        conn: ConnId,
    },
    Ball {
        from: ConnId,
        ball: BallWire,
        target: String,
    },
    Merge {
        axis: MergeAxis,
        first: String,
        second: String,
    },
    Unmerge {
        name: String,
        wall: Direction,
    },
}

/// Run the router. Owns the registry; every change is published to
/// `snapshot_tx` before the resulting lines are sent.
pub async fn run_router(
    mut cmd_rx: mpsc::Receiver<RouterCommand>,
    snapshot_tx: watch::Sender<RegistrySnapshot>,
) {
    let mut registry = Registry::default();
    let mut outbound: HashMap<ConnId, mpsc::Sender<ServerMsg>> = HashMap::new();

    while let Some(cmd) = cmd_rx.recv().await {
        let notices = match cmd {
            RouterCommand::Register {
                conn,
                name,
                outbound: tx,
            } => {
                outbound.insert(conn, tx);
                match registry.register(conn, &name) {
                    Ok(()) => {
                        tracing::info!(conn, board = %name, "board registered");
                        vec![Notice {
                            to: conn,
                            msg: ServerMsg::Start,
                        }]
                    }
                    Err(e) => {
                        tracing::info!(conn, board = %name, "registration refused: {e}");
                        let reason = match e {
                            RegistryError::NameTaken(_) => NAME_TAKEN.to_string(),
                            other => other.to_string(),
                        };
                        deliver(&outbound, Notice {
                            to: conn,
                            msg: ServerMsg::Reject(reason),
                        });
                        continue;
                    }
                }
            }
            RouterCommand::Disconnect { conn } => {
                outbound.remove(&conn);
                if let Some(name) = registry.name_of(conn) {
                    tracing::info!(conn, board = name, "board left");
                }
                registry.disconnect(conn)
            }
            RouterCommand::Ball { from, ball, target } => {
                if !registry.is_registered(from) {
                    tracing::debug!(from, "ball from unregistered connection ignored");
                    continue;
                }
                match registry.route(ball, &target) {
                    Some(notice) => deliver(&outbound, notice),
                    None => tracing::debug!(%target, "no board to receive ball; dropped"),
                }
                continue;
            }
            RouterCommand::Merge {
                axis,
                first,
                second,
            } => match registry.merge(axis, &first, &second) {
                Ok(notices) => {
                    tracing::info!(%axis, %first, %second, "boards merged");
                    notices
                }
                Err(e) => {
                    tracing::warn!("merge {axis} {first} {second} failed: {e}");
                    continue;
                }
            },
            RouterCommand::Unmerge { name, wall } => match registry.unmerge(&name, wall) {
                Ok(notices) => {
                    tracing::info!(board = %name, wall = wall.label(), "wall restored");
                    notices
                }
                Err(e) => {
                    tracing::warn!("unmerge {name} {wall} failed: {e}");
                    continue;
                }
            },
        };

        snapshot_tx.send_replace(registry.snapshot());
        for notice in notices {
            deliver(&outbound, notice);
        }
    }

    tracing::info!("Router stopped");
}

/// Queues a line without waiting; a full or closed queue drops it.
fn deliver(outbound: &HashMap<ConnId, mpsc::Sender<ServerMsg>>, notice: Notice) {
    let Some(tx) = outbound.get(&notice.to) else {
        tracing::debug!(conn = notice.to, "no outbound queue; dropping {}", notice.msg);
        return;
    };
    if let Err(e) = tx.try_send(notice.msg) {
        tracing::warn!(conn = notice.to, "dropping outbound line: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        cmd_tx: mpsc::Sender<RouterCommand>,
        snapshot_rx: watch::Receiver<RegistrySnapshot>,
    }

    fn spawn_router() -> Harness {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(RegistrySnapshot::default());
        tokio::spawn(run_router(cmd_rx, snapshot_tx));
        Harness {
            cmd_tx,
            snapshot_rx,
        }
    }

    async fn join(h: &Harness, conn: ConnId, name: &str) -> mpsc::Receiver<ServerMsg> {
        let (tx, rx) = mpsc::channel(8);
        h.cmd_tx
            .send(RouterCommand::Register {
                conn,
                name: name.to_string(),
                outbound: tx,
            })
            .await
            .unwrap();
        rx
    }

    async fn next(rx: &mut mpsc::Receiver<ServerMsg>) -> ServerMsg {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn register_answers_start_then_reject_for_duplicates() {
        let h = spawn_router();
        let mut a = join(&h, 1, "A").await;
        let mut dup = join(&h, 2, "A").await;
        assert_eq!(next(&mut a).await, ServerMsg::Start);
        assert_eq!(next(&mut dup).await, ServerMsg::Reject(NAME_TAKEN.to_string()));
    }

    #[tokio::test]
    async fn snapshot_is_published_before_start_arrives() {
        let h = spawn_router();
        let mut a = join(&h, 1, "A").await;
        next(&mut a).await;
        assert!(h.snapshot_rx.borrow().contains("A"));
    }

    #[tokio::test]
    async fn ball_is_forwarded_to_target_without_its_address() {
        let h = spawn_router();
        let mut a = join(&h, 1, "A").await;
        let mut b = join(&h, 2, "B").await;
        next(&mut a).await;
        next(&mut b).await;
        let ball = BallWire {
            name: "ball".into(),
            x: 1.0,
            y: 5.0,
            vx: 2.0,
            vy: 0.0,
        };
        h.cmd_tx
            .send(RouterCommand::Ball {
                from: 1,
                ball: ball.clone(),
                target: "B".into(),
            })
            .await
            .unwrap();
        assert_eq!(next(&mut b).await, ServerMsg::Ball(ball));
    }

    #[tokio::test]
    async fn full_outbound_queue_drops_instead_of_blocking() {
        let h = spawn_router();
        let (tx, mut slow) = mpsc::channel(1);
        h.cmd_tx
            .send(RouterCommand::Register {
                conn: 1,
                name: "Slow".into(),
                outbound: tx,
            })
            .await
            .unwrap();
        let mut other = join(&h, 2, "Other").await;
        next(&mut other).await;
        // START already fills Slow's queue; this merge notice must not stall the router.
        h.cmd_tx
            .send(RouterCommand::Merge {
                axis: MergeAxis::Horizontal,
                first: "Slow".into(),
                second: "Other".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            next(&mut other).await,
            ServerMsg::Merge {
                wall: Direction::Left,
                neighbor: "Slow".into()
            }
        );
        assert_eq!(next(&mut slow).await, ServerMsg::Start);
    }
}
