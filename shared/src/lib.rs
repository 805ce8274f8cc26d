//! Types shared by the pingball client and server: the line protocol and
//! common constants.

pub mod config;
pub mod protocol;
