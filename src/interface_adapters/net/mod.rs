// Network adapter: per-connection session pumps and message dispatch.

pub mod dispatch;
pub mod session;

pub use session::ws_handler;

use crate::interface_adapters::hub::HubError;
use std::fmt;

#[derive(Debug)]
pub enum NetError {
    /// A reply could not be encoded; the session keeps running.
    Serialization(serde_json::Error),
    /// The hub is gone; the session has to close.
    Hub(HubError),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Serialization(e) => write!(f, "serialization failed: {e}"),
            NetError::Hub(e) => write!(f, "{e}"),
        }
    }
}

impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::Serialization(e)
    }
}

impl From<HubError> for NetError {
    fn from(e: HubError) -> Self {
        NetError::Hub(e)
    }
}
