use std::path::PathBuf;

use thiserror::Error;

/// Problems found while loading a board file. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read board file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("board file has no `board` line")]
    MissingBoard,
    #[error("line {line}: a board file may contain only one `board` line")]
    DuplicateBoard { line: usize },
    #[error("name `{0}` is used more than once")]
    DuplicateName(String),
    #[error("`{0}` does not fit on the board")]
    OutOfBounds(String),
    #[error("`fire` names unknown gadget `{0}`")]
    UnknownGadget(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("absorber `{name}` is holding {capacity} balls and cannot take another")]
    AbsorberOverflow { name: String, capacity: usize },
}

/// Failures of the server connection.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("could not reach server: {0}")]
    Io(#[from] std::io::Error),
    #[error("server rejected board name: {0}")]
    Rejected(String),
    #[error("server closed the connection during the handshake")]
    Closed,
    #[error("network thread stopped: {0}")]
    Runtime(String),
}
