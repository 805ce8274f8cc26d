use std::collections::{BTreeMap, HashMap};

use pingball_shared::protocol::{BallWire, Direction, MergeAxis, ServerMsg};
use serde::Serialize;
use thiserror::Error;

/// Server-assigned id of one TCP connection.
pub type ConnId = u64;

/// A line the router should deliver to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub to: ConnId,
    pub msg: ServerMsg,
}

impl Notice {
    fn wall(to: ConnId, wall: Direction) -> Self {
        Self {
            to,
            msg: ServerMsg::Wall { wall },
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("board name `{0}` is already taken")]
    NameTaken(String),
    #[error("connection is already registered as `{0}`")]
    AlreadyRegistered(String),
    #[error("no board named `{0}`")]
    UnknownBoard(String),
}

/// Read-only copy of the registry published after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    /// Board name to its neighbors by wall.
    pub boards: BTreeMap<String, BTreeMap<Direction, String>>,
}

impl RegistrySnapshot {
    pub fn contains(&self, name: &str) -> bool {
        self.boards.contains_key(name)
    }
}

/// Who is connected and which walls are shared.
///
/// Every neighbor entry has its mirror: if `a` lists `b` on side `s`,
/// then `b` lists `a` on `s.opposite()`.
#[derive(Debug, Default)]
pub struct Registry {
    players: HashMap<String, ConnId>,
    names: HashMap<ConnId, String>,
    neighbors: HashMap<ConnId, BTreeMap<Direction, ConnId>>,
}

impl Registry {
    pub fn register(&mut self, conn: ConnId, name: &str) -> Result<(), RegistryError> {
        if let Some(existing) = self.names.get(&conn) {
            return Err(RegistryError::AlreadyRegistered(existing.clone()));
        }
        if self.players.contains_key(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        self.players.insert(name.to_string(), conn);
        self.names.insert(conn, name.to_string());
        self.neighbors.insert(conn, BTreeMap::new());
        Ok(())
    }

    pub fn is_registered(&self, conn: ConnId) -> bool {
        self.names.contains_key(&conn)
    }

    pub fn name_of(&self, conn: ConnId) -> Option<&str> {
        self.names.get(&conn).map(String::as_str)
    }

    fn conn_of(&self, name: &str) -> Result<ConnId, RegistryError> {
        self.players
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownBoard(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Removes `conn`'s link on `side` and its mirror. The former neighbor
    /// is told its wall is back unless it is `keep`, the board about to be
    /// linked there anyway.
    fn evict(&mut self, conn: ConnId, side: Direction, keep: ConnId, notices: &mut Vec<Notice>) {
        let Some(&old) = self.neighbors.get(&conn).and_then(|n| n.get(&side)) else {
            return;
        };
        if old == keep {
            return;
        }
        self.unlink(conn, side);
        self.unlink(old, side.opposite());
        notices.push(Notice::wall(old, side.opposite()));
    }

    fn link(&mut self, conn: ConnId, side: Direction, other: ConnId) {
        self.neighbors.entry(conn).or_default().insert(side, other);
    }

    fn unlink(&mut self, conn: ConnId, side: Direction) -> Option<ConnId> {
        self.neighbors.get_mut(&conn).and_then(|n| n.remove(&side))
    }

    /// Joins `first` and `second` along `axis`: `v` puts `first` above
    /// `second`, `h` puts `first` to the left. A board may be merged with
    /// itself, which wraps it around.
    pub fn merge(
        &mut self,
        axis: MergeAxis,
        first: &str,
        second: &str,
    ) -> Result<Vec<Notice>, RegistryError> {
        let a = self.conn_of(first)?;
        let b = self.conn_of(second)?;
        let (a_side, b_side) = axis.sides();

        let mut notices = Vec::new();
        self.evict(a, a_side, b, &mut notices);
        self.evict(b, b_side, a, &mut notices);
        self.link(a, a_side, b);
        self.link(b, b_side, a);

        notices.push(Notice {
            to: a,
            msg: ServerMsg::Merge {
                wall: a_side,
                neighbor: second.to_string(),
            },
        });
        notices.push(Notice {
            to: b,
            msg: ServerMsg::Merge {
                wall: b_side,
                neighbor: first.to_string(),
            },
        });
        Ok(notices)
    }

    /// Makes `name`'s `wall` solid again, along with the matching wall on
    /// the other side.
    pub fn unmerge(&mut self, name: &str, wall: Direction) -> Result<Vec<Notice>, RegistryError> {
        let conn = self.conn_of(name)?;
        let Some(other) = self.unlink(conn, wall) else {
            return Ok(Vec::new());
        };
        self.unlink(other, wall.opposite());
        Ok(vec![
            Notice::wall(conn, wall),
            Notice::wall(other, wall.opposite()),
        ])
    }

    /// Forgets `conn` and restores every wall that pointed at it.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<Notice> {
        let Some(name) = self.names.remove(&conn) else {
            return Vec::new();
        };
        self.players.remove(&name);
        let links = self.neighbors.remove(&conn).unwrap_or_default();
        let mut notices = Vec::new();
        for (side, other) in links {
            if other == conn {
                continue;
            }
            if self.unlink(other, side.opposite()).is_some() {
                notices.push(Notice::wall(other, side.opposite()));
            }
        }
        notices
    }

    /// Addresses a handed-off ball to `target`, or `None` if no such board.
    pub fn route(&self, ball: BallWire, target: &str) -> Option<Notice> {
        let to = self.conn_of(target).ok()?;
        Some(Notice {
            to,
            msg: ServerMsg::Ball(ball),
        })
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let boards = self
            .players
            .iter()
            .map(|(name, conn)| {
                let sides: BTreeMap<Direction, String> = self
                    .neighbors
                    .get(conn)
                    .into_iter()
                    .flatten()
                    .filter_map(|(side, other)| {
                        self.names.get(other).map(|n| (*side, n.clone()))
                    })
                    .collect();
                (name.clone(), sides)
            })
            .collect();
        RegistrySnapshot { boards }
    }
}
