use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

// Runtime/server constants and env-driven settings.

pub const WS_PATH: &str = "/ws";

pub const DEFAULT_PORT: u16 = 8899;
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_HUB_EVENT_CAPACITY: usize = 256;

pub fn http_port() -> u16 {
    env::var("RELAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn bind_host() -> IpAddr {
    env::var("RELAY_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub fn bind_address() -> SocketAddr {
    SocketAddr::new(bind_host(), http_port())
}

/// Per-session outbound queue size. A session whose queue fills up is evicted.
pub fn outbound_queue_capacity() -> usize {
    parse_capacity(
        env::var("RELAY_OUTBOUND_QUEUE").ok().as_deref(),
        DEFAULT_OUTBOUND_QUEUE_CAPACITY,
    )
}

pub fn hub_event_capacity() -> usize {
    parse_capacity(
        env::var("RELAY_HUB_EVENTS").ok().as_deref(),
        DEFAULT_HUB_EVENT_CAPACITY,
    )
}

// Channel capacities must be non-zero; anything unparsable falls back.
fn parse_capacity(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}
