use std::path::PathBuf;

use pingball_shared::config::DEFAULT_PORT;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to join; local play when `None`.
    pub host: Option<String>,
    pub port: u16,
    pub board_file: PathBuf,
    /// Print the board once every this many ticks.
    pub render_every: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            board_file: PathBuf::new(),
            render_every: 50,
        }
    }
}

impl ClientConfig {
    pub fn server_addr(&self) -> Option<String> {
        self.host.as_ref().map(|host| format!("{host}:{}", self.port))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.board_file.as_os_str().is_empty() {
            return Err("a board file is required".to_string());
        }
        if self.render_every == 0 {
            return Err("render_every must be at least 1".to_string());
        }
        if self.port == 0 && self.host.is_some() {
            return Err("port must be non-zero".to_string());
        }
        if self.host.as_deref().is_some_and(str::is_empty) {
            return Err("host must not be empty".to_string());
        }
        Ok(())
    }
}
