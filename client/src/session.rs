use pingball_shared::protocol::{ClientMsg, ServerMsg};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use std::time::Duration;

use crate::board::{Board, MAX_TICK};
use crate::error::SimulationError;

/// Result of one simulation step as seen by the network layer.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub dt: f64,
    /// Hand-offs addressed to neighboring boards.
    pub outbound: Vec<ClientMsg>,
}

/// Joins a board to the server's message stream. Inbound messages are
/// applied at the start of each tick in arrival order; balls leaving
/// through invisible walls come back out as `BALL` lines.
pub struct Session {
    board: Board,
    inbox: mpsc::Receiver<ServerMsg>,
}

impl Session {
    pub fn new(board: Board, inbox: mpsc::Receiver<ServerMsg>) -> Self {
        Self { board, inbox }
    }

    /// A session with no server; the inbox stays empty.
    pub fn local(board: Board) -> Self {
        let (_, inbox) = mpsc::channel(1);
        Self::new(board, inbox)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn apply(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::Merge { wall, neighbor } => {
                info!(wall = wall.label(), %neighbor, "joined neighbor");
                self.board.join(wall, neighbor);
            }
            ServerMsg::Wall { wall } => {
                info!(wall = wall.label(), "wall restored");
                self.board.restore_wall(wall);
            }
            ServerMsg::Ball(wire) => {
                debug!(ball = %wire.name, x = wire.x, y = wire.y, "ball arrived");
                self.board.add_wire_ball(&wire);
            }
            other @ (ServerMsg::Start | ServerMsg::Reject(_)) => {
                debug!(msg = %other, "ignoring handshake message after start");
            }
        }
    }

    /// Applies everything queued so far; returns how many messages it took.
    pub fn drain_inbox(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.inbox.try_recv() {
            self.apply(msg);
            applied += 1;
        }
        applied
    }

    pub fn tick(&mut self) -> Result<TickOutcome, SimulationError> {
        self.drain_inbox();
        let report = self.board.tick()?;
        let mut outbound = Vec::with_capacity(report.handoffs.len());
        for (wall, ball) in report.handoffs {
            match self.board.neighbor(wall) {
                Some(target) => outbound.push(ClientMsg::Ball {
                    ball: ball.to_wire(),
                    target: target.to_string(),
                }),
                None => warn!(ball = ball.name(), wall = wall.label(), "no neighbor for hand-off"),
            }
        }
        Ok(TickOutcome {
            dt: report.dt,
            outbound,
        })
    }
}

/// How long to wait before the next tick so the board clock tracks wall
/// time. Waits come in whole ticks: a clock less than `MAX_TICK` ahead runs
/// on without sleeping.
pub fn pacing_delay(clock: f64, elapsed: Duration) -> Option<Duration> {
    let lead = clock - elapsed.as_secs_f64();
    (lead >= MAX_TICK).then(|| Duration::from_secs_f64(lead))
}
