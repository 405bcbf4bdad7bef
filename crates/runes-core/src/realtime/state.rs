use std::fmt;

/// Lifecycle of the realtime connection.
///
/// `Disconnected → Connecting → Open → Closing → Disconnected`, with
/// `ReconnectPending` entered after a close the caller did not ask for while
/// the reconnect budget lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    ReconnectPending,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::ReconnectPending => write!(f, "reconnect_pending"),
        }
    }
}
