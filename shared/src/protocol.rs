use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::is_valid_name;

/// Reason sent with `REJECT` when a board name is already registered.
pub const NAME_TAKEN: &str = "Board name already exists.";

/// One of the four outer walls of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "T")]
    Top,
    #[serde(rename = "B")]
    Bottom,
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    /// The wall a neighbor uses for the same shared edge.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Stable index in `ALL` order.
    pub fn index(self) -> usize {
        match self {
            Direction::Top => 0,
            Direction::Bottom => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Direction::Top => 'T',
            Direction::Bottom => 'B',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }

    /// Lowercase long name, used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T" => Ok(Direction::Top),
            "B" => Ok(Direction::Bottom),
            "L" => Ok(Direction::Left),
            "R" => Ok(Direction::Right),
            other => Err(ProtocolError::InvalidDirection(other.to_string())),
        }
    }
}

/// How two boards are joined by an operator merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAxis {
    /// First board on top, second below.
    Vertical,
    /// First board on the left, second on the right.
    Horizontal,
}

impl MergeAxis {
    /// Walls joined by this merge: (first board's wall, second board's wall).
    pub fn sides(self) -> (Direction, Direction) {
        match self {
            MergeAxis::Vertical => (Direction::Bottom, Direction::Top),
            MergeAxis::Horizontal => (Direction::Right, Direction::Left),
        }
    }
}

impl fmt::Display for MergeAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeAxis::Vertical => write!(f, "v"),
            MergeAxis::Horizontal => write!(f, "h"),
        }
    }
}

impl FromStr for MergeAxis {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v" => Ok(MergeAxis::Vertical),
            "h" => Ok(MergeAxis::Horizontal),
            other => Err(ProtocolError::InvalidAxis(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("`{kind}` expects {expected} fields, got {got}")]
    Arity {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid direction `{0}`")]
    InvalidDirection(String),
    #[error("invalid merge axis `{0}`")]
    InvalidAxis(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid name `{0}`")]
    InvalidName(String),
}

/// Kinematic state of a ball crossing between boards.
#[derive(Debug, Clone, PartialEq)]
pub struct BallWire {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl BallWire {
    fn parse_fields(fields: &[&str]) -> Result<Self, ProtocolError> {
        let [name, x, y, vx, vy] = fields else {
            return Err(ProtocolError::Arity {
                kind: "BALL",
                expected: 5,
                got: fields.len(),
            });
        };
        Ok(Self {
            name: parse_name(name)?,
            x: parse_number(x)?,
            y: parse_number(y)?,
            vx: parse_number(vx)?,
            vy: parse_number(vy)?,
        })
    }
}

impl fmt::Display for BallWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.name, self.x, self.y, self.vx, self.vy
        )
    }
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMsg {
    /// Registration accepted; simulation may start.
    Start,
    /// Registration refused; the client may retry with `NAME`.
    Reject(String),
    /// The given wall is now shared with `neighbor`.
    Merge { wall: Direction, neighbor: String },
    /// The given wall is solid again.
    Wall { wall: Direction },
    /// A ball enters this board.
    Ball(BallWire),
}

impl fmt::Display for ServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMsg::Start => write!(f, "START"),
            ServerMsg::Reject(reason) => write!(f, "REJECT {}", reason),
            ServerMsg::Merge { wall, neighbor } => write!(f, "MERGE {} {}", wall, neighbor),
            ServerMsg::Wall { wall } => write!(f, "WALL {}", wall),
            ServerMsg::Ball(ball) => write!(f, "BALL {}", ball),
        }
    }
}

impl FromStr for ServerMsg {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (kind, rest) = split_kind(line)?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        match kind {
            "START" => {
                expect_arity("START", &fields, 0)?;
                Ok(ServerMsg::Start)
            }
            "REJECT" => Ok(ServerMsg::Reject(rest.trim().to_string())),
            "MERGE" => {
                expect_arity("MERGE", &fields, 2)?;
                Ok(ServerMsg::Merge {
                    wall: fields[0].parse()?,
                    neighbor: parse_name(fields[1])?,
                })
            }
            "WALL" => {
                expect_arity("WALL", &fields, 1)?;
                Ok(ServerMsg::Wall {
                    wall: fields[0].parse()?,
                })
            }
            "BALL" => Ok(ServerMsg::Ball(BallWire::parse_fields(&fields)?)),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    /// Register this connection under a board name.
    Name(String),
    /// Hand a ball off to the neighboring board `target`.
    Ball { ball: BallWire, target: String },
}

impl fmt::Display for ClientMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMsg::Name(name) => write!(f, "NAME {}", name),
            ClientMsg::Ball { ball, target } => write!(f, "BALL {} {}", ball, target),
        }
    }
}

impl FromStr for ClientMsg {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (kind, rest) = split_kind(line)?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        match kind {
            "NAME" => {
                expect_arity("NAME", &fields, 1)?;
                Ok(ClientMsg::Name(parse_name(fields[0])?))
            }
            "BALL" => {
                let Some((target, ball_fields)) = fields.split_last() else {
                    return Err(ProtocolError::Arity {
                        kind: "BALL",
                        expected: 6,
                        got: 0,
                    });
                };
                if ball_fields.len() != 5 {
                    return Err(ProtocolError::Arity {
                        kind: "BALL",
                        expected: 6,
                        got: fields.len(),
                    });
                }
                Ok(ClientMsg::Ball {
                    ball: BallWire::parse_fields(ball_fields)?,
                    target: parse_name(target)?,
                })
            }
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

// === Helpers ===

fn split_kind(line: &str) -> Result<(&str, &str), ProtocolError> {
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(line.split_once(' ').unwrap_or((line, "")))
}

fn expect_arity(kind: &'static str, fields: &[&str], expected: usize) -> Result<(), ProtocolError> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::Arity {
            kind,
            expected,
            got: fields.len(),
        })
    }
}

fn parse_number(token: &str) -> Result<f64, ProtocolError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProtocolError::InvalidNumber(token.to_string()))
}

pub fn parse_name(token: &str) -> Result<String, ProtocolError> {
    if is_valid_name(token) {
        Ok(token.to_string())
    } else {
        Err(ProtocolError::InvalidName(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> BallWire {
        BallWire {
            name: "Ball".to_string(),
            x: 3.5,
            y: 1.0,
            vx: -0.1,
            vy: 12.25,
        }
    }

    #[test]
    fn client_ball_carries_target() {
        let msg = ClientMsg::Ball {
            ball: ball(),
            target: "Right_Board".to_string(),
        };
        let line = msg.to_string();
        assert_eq!(line, "BALL Ball 3.5 1 -0.1 12.25 Right_Board");
        assert_eq!(line.parse::<ClientMsg>().unwrap(), msg);
    }

    #[test]
    fn server_ball_omits_target() {
        let line = ServerMsg::Ball(ball()).to_string();
        assert_eq!(line, "BALL Ball 3.5 1 -0.1 12.25");
        match line.parse::<ServerMsg>().unwrap() {
            ServerMsg::Ball(b) => assert_eq!(b, ball()),
            other => panic!("Expected Ball, got {:?}", other),
        }
    }

    #[test]
    fn velocities_survive_text_encoding_exactly() {
        let mut b = ball();
        b.vx = 1.0 / 3.0;
        b.vy = -std::f64::consts::PI;
        let line = ServerMsg::Ball(b.clone()).to_string();
        match line.parse::<ServerMsg>().unwrap() {
            ServerMsg::Ball(parsed) => {
                assert_eq!(parsed.vx.to_bits(), b.vx.to_bits());
                assert_eq!(parsed.vy.to_bits(), b.vy.to_bits());
            }
            other => panic!("Expected Ball, got {:?}", other),
        }
    }

    #[test]
    fn merge_and_wall_parse() {
        assert_eq!(
            "MERGE L Alice".parse::<ServerMsg>().unwrap(),
            ServerMsg::Merge {
                wall: Direction::Left,
                neighbor: "Alice".to_string()
            }
        );
        assert_eq!(
            "WALL B".parse::<ServerMsg>().unwrap(),
            ServerMsg::Wall {
                wall: Direction::Bottom
            }
        );
    }

    #[test]
    fn reject_keeps_reason_text() {
        let line = ServerMsg::Reject(NAME_TAKEN.to_string()).to_string();
        assert_eq!(
            line.parse::<ServerMsg>().unwrap(),
            ServerMsg::Reject(NAME_TAKEN.to_string())
        );
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert_eq!("".parse::<ServerMsg>(), Err(ProtocolError::Empty));
        assert!(matches!(
            "HELLO there".parse::<ServerMsg>(),
            Err(ProtocolError::UnknownType(_))
        ));
        assert!(matches!(
            "WALL X".parse::<ServerMsg>(),
            Err(ProtocolError::InvalidDirection(_))
        ));
        assert!(matches!(
            "BALL b 1 2 3".parse::<ServerMsg>(),
            Err(ProtocolError::Arity { .. })
        ));
        assert!(matches!(
            "BALL b 1 2 nan 4".parse::<ServerMsg>(),
            Err(ProtocolError::InvalidNumber(_))
        ));
        assert!(matches!(
            "BALL b 1 2 3 4".parse::<ClientMsg>(),
            Err(ProtocolError::Arity { .. })
        ));
        assert!(matches!(
            "NAME 9lives".parse::<ClientMsg>(),
            Err(ProtocolError::InvalidName(_))
        ));
    }

    #[test]
    fn merge_axis_sides_are_opposite() {
        for axis in [MergeAxis::Vertical, MergeAxis::Horizontal] {
            let (a, b) = axis.sides();
            assert_eq!(a.opposite(), b);
        }
        assert_eq!("v".parse::<MergeAxis>().unwrap(), MergeAxis::Vertical);
        assert!("x".parse::<MergeAxis>().is_err());
    }

    #[test]
    fn direction_indices_follow_all_order() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
            assert_eq!(dir.opposite().opposite(), *dir);
            assert_eq!(dir.to_string().parse::<Direction>().unwrap(), *dir);
        }
    }

    #[test]
    fn direction_serializes_as_its_letter() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"L\"");
        let back: Direction = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(back, Direction::Bottom);
    }
}
