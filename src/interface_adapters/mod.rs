// Interface adapters: wire protocol, session hub and network handling.

pub mod hub;
pub mod net;
pub mod protocol;
pub mod state;
