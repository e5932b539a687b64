use std::fmt;

/// Result type for SoundNav operations.
pub type Result<T = ()> = std::result::Result<T, SoundNavError>;

/// Everything that can go wrong between configuration and the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundNavError {
    /// Endpoint could not be resolved or the socket could not be created.
    Connection(String),
    /// A send was attempted with no open connection.
    NotConnected,
    /// The local network stack refused a datagram (oversized, no route).
    Send(String),
    /// Invalid user configuration: bad index, address, name or missing path.
    Configuration(String),
    /// The external audio process could not be found or launched.
    ExternalResource(String),
}

impl fmt::Display for SoundNavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundNavError::Connection(msg) => write!(f, "connection failed: {}", msg),
            SoundNavError::NotConnected => write!(f, "OSC client is not connected"),
            SoundNavError::Send(msg) => write!(f, "send failed: {}", msg),
            SoundNavError::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            SoundNavError::ExternalResource(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SoundNavError {}

impl From<std::io::Error> for SoundNavError {
    fn from(e: std::io::Error) -> Self {
        SoundNavError::Send(e.to_string())
    }
}

impl From<rosc::OscError> for SoundNavError {
    fn from(e: rosc::OscError) -> Self {
        SoundNavError::Configuration(format!("OSC encoding: {:?}", e))
    }
}
