//! Pingball server library.
//!
//! Boards connect over TCP, register a name, and exchange balls through
//! walls an operator has merged. This module exposes the server pieces for
//! use in tests and the binary.

pub mod admin;
pub mod config;
pub mod connection;
pub mod router;
pub mod state;
pub mod status;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::connection::accept_loop;
use crate::router::{run_router, RouterCommand};
use crate::state::RegistrySnapshot;

/// A running server: the router plus its accept loop.
pub struct ServerHandle {
    pub router_tx: mpsc::Sender<RouterCommand>,
    pub snapshot_rx: watch::Receiver<RegistrySnapshot>,
    pub local_addr: SocketAddr,
    pub accept_task: JoinHandle<()>,
}

/// Spawns the router and starts accepting boards on `listener`.
pub fn start(listener: TcpListener, config: &ServerConfig) -> std::io::Result<ServerHandle> {
    let local_addr = listener.local_addr()?;
    let (router_tx, router_rx) = mpsc::channel::<RouterCommand>(config.queue_capacity);
    let (snapshot_tx, snapshot_rx) = watch::channel(RegistrySnapshot::default());

    tokio::spawn(run_router(router_rx, snapshot_tx));
    let accept_task = tokio::spawn(accept_loop(
        listener,
        router_tx.clone(),
        config.outbound_capacity,
    ));

    Ok(ServerHandle {
        router_tx,
        snapshot_rx,
        local_addr,
        accept_task,
    })
}
