use pingball_shared::config::{DEFAULT_PORT, QUEUE_CAPACITY};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Address of the read-only HTTP status endpoint; disabled when `None`.
    pub status_addr: Option<String>,
    /// Capacity of the router's command queue.
    pub queue_capacity: usize,
    /// Capacity of each connection's outbound line queue.
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            status_addr: None,
            queue_capacity: QUEUE_CAPACITY,
            outbound_capacity: QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".to_string());
        }
        if self.outbound_capacity == 0 {
            return Err("outbound_capacity must be at least 1".to_string());
        }
        if self.status_addr.as_deref() == Some(self.listen_addr.as_str()) {
            return Err("status_addr must differ from listen_addr".to_string());
        }
        Ok(())
    }
}
