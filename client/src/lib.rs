//! Pingball client: one 20x20 pinball board simulated locally, optionally
//! joined to neighbors through a server.

pub mod board;
pub mod config;
pub mod connection;
pub mod error;
pub mod parser;
pub mod render;
pub mod session;
