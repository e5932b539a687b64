use serde::{Deserialize, Serialize};

pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Port Pure Data's `[netreceive -u -b]` patches listen on by default.
pub const DEFAULT_PORT: u16 = 7400;

/// Address of the OSC receiver. Replaced as a whole on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOSTNAME, DEFAULT_PORT)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}
