use std::net::SocketAddr;

/// Where the API listens and how loudly it traces responses.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub response_log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            response_log_level: tracing::Level::INFO,
        }
    }
}
