//! Operator console on stdin.
//!
//! ```text
//! MERGE v top bottom     # or just `v top bottom`
//! h left right
//! WALL left R            # restore one wall
//! ```

use pingball_shared::protocol::{Direction, MergeAxis};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};

use crate::router::RouterCommand;
use crate::state::RegistrySnapshot;

const NAME: &str = "[A-Za-z_][A-Za-z_0-9]*";

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
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

impl From<AdminCommand> for RouterCommand {
    fn from(cmd: AdminCommand) -> Self {
        match cmd {
            AdminCommand::Merge {
                axis,
                first,
                second,
            } => RouterCommand::Merge {
                axis,
                first,
                second,
            },
            AdminCommand::Unmerge { name, wall } => RouterCommand::Unmerge { name, wall },
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AdminError {
    #[error("expected `[MERGE] v|h <board> <board>` or `WALL <board> T|B|L|R`, got `{0}`")]
    Malformed(String),
    #[error("no board named `{0}` is connected")]
    UnknownBoard(String),
}

pub struct AdminConsole {
    merge: Regex,
    wall: Regex,
}

impl AdminConsole {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            merge: Regex::new(&format!(r"^(?:MERGE\s+)?(v|h)\s+({NAME})\s+({NAME})$"))?,
            wall: Regex::new(&format!(r"^WALL\s+({NAME})\s+([TBLR])$"))?,
        })
    }

    /// Parses one console line without checking who is connected.
    pub fn parse(&self, line: &str) -> Result<AdminCommand, AdminError> {
        let line = line.trim();
        let malformed = || AdminError::Malformed(line.to_string());

        if let Some(caps) = self.merge.captures(line) {
            let axis = caps[1].parse().map_err(|_| malformed())?;
            return Ok(AdminCommand::Merge {
                axis,
                first: caps[2].to_string(),
                second: caps[3].to_string(),
            });
        }
        if let Some(caps) = self.wall.captures(line) {
            let wall = caps[2].parse().map_err(|_| malformed())?;
            return Ok(AdminCommand::Unmerge {
                name: caps[1].to_string(),
                wall,
            });
        }
        Err(malformed())
    }

    /// Parses `line` and checks every named board is in `snapshot`.
    pub fn check(
        &self,
        line: &str,
        snapshot: &RegistrySnapshot,
    ) -> Result<AdminCommand, AdminError> {
        let cmd = self.parse(line)?;
        let names: Vec<&str> = match &cmd {
            AdminCommand::Merge { first, second, .. } => vec![first.as_str(), second.as_str()],
            AdminCommand::Unmerge { name, .. } => vec![name.as_str()],
        };
        if let Some(missing) = names.into_iter().find(|n| !snapshot.contains(n)) {
            return Err(AdminError::UnknownBoard(missing.to_string()));
        }
        Ok(cmd)
    }
}

/// Reads console lines until EOF, forwarding valid commands to the router.
pub async fn run_admin<R>(
    reader: R,
    console: AdminConsole,
    router_tx: mpsc::Sender<RouterCommand>,
    snapshot_rx: watch::Receiver<RegistrySnapshot>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("admin input failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let checked = {
            let snapshot = snapshot_rx.borrow();
            console.check(&line, &snapshot)
        };
        match checked {
            Ok(cmd) => {
                if router_tx.send(cmd.into()).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }
    tracing::info!("Admin console closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(names: &[&str]) -> RegistrySnapshot {
        RegistrySnapshot {
            boards: names
                .iter()
                .map(|n| (n.to_string(), BTreeMap::new()))
                .collect(),
        }
    }

    #[test]
    fn merge_with_and_without_prefix() {
        let console = AdminConsole::new().unwrap();
        let expected = AdminCommand::Merge {
            axis: MergeAxis::Vertical,
            first: "A".into(),
            second: "B".into(),
        };
        assert_eq!(console.parse("v A B").unwrap(), expected);
        assert_eq!(console.parse("MERGE v A B").unwrap(), expected);
        assert!(matches!(
            console.parse("h A B").unwrap(),
            AdminCommand::Merge {
                axis: MergeAxis::Horizontal,
                ..
            }
        ));
    }

    #[test]
    fn wall_command() {
        let console = AdminConsole::new().unwrap();
        assert_eq!(
            console.parse("WALL A L").unwrap(),
            AdminCommand::Unmerge {
                name: "A".into(),
                wall: Direction::Left
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        let console = AdminConsole::new().unwrap();
        for line in ["x A B", "v A", "v A B C", "v 1A B", "WALL A X", "MERGE"] {
            assert!(
                matches!(console.parse(line), Err(AdminError::Malformed(_))),
                "{line}"
            );
        }
    }

    #[test]
    fn check_requires_connected_boards() {
        let console = AdminConsole::new().unwrap();
        let snap = snapshot(&["A"]);
        assert_eq!(
            console.check("v A B", &snap),
            Err(AdminError::UnknownBoard("B".into()))
        );
        assert!(console.check("WALL A T", &snap).is_ok());
        assert!(console.check("h A A", &snap).is_ok());
    }

    #[tokio::test]
    async fn forwards_only_valid_commands() {
        let console = AdminConsole::new().unwrap();
        let (router_tx, mut router_rx) = mpsc::channel(8);
        let (_snapshot_tx, snapshot_rx) = watch::channel(snapshot(&["A", "B"]));
        let input: &[u8] = b"v A Z\nbogus\n\nh A B\n";
        run_admin(input, console, router_tx, snapshot_rx).await;

        match router_rx.recv().await {
            Some(RouterCommand::Merge {
                axis,
                first,
                second,
            }) => {
                assert_eq!(axis, MergeAxis::Horizontal);
                assert_eq!((first.as_str(), second.as_str()), ("A", "B"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(router_rx.recv().await.is_none());
    }
}
