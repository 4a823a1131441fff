mod support;

use drive_relay::domain::World;
use drive_relay::interface_adapters::hub::SessionHub;
use drive_relay::interface_adapters::state::AppState;
use drive_relay::use_cases::PlayerRegistry;
use std::sync::Arc;
use std::time::Duration;
use support::{TestClient, start_server_with};

// The join handshake queues three frames, so a two-slot queue overflows
// before the writer task gets a turn on this single-threaded runtime.
const TINY_QUEUE: usize = 2;

#[tokio::test(flavor = "current_thread")]
async fn overflowing_session_is_closed_and_forgotten() {
    let registry = Arc::new(PlayerRegistry::new());
    let hub = SessionHub::spawn(registry.clone(), 64);
    let state = AppState::new(hub, registry.clone(), &World::default_layout(), TINY_QUEUE)
        .expect("world state encodes");
    let url = start_server_with(state).await;

    let mut observer = TestClient::connect(&url).await;
    let mut slow = TestClient::connect(&url).await;
    slow.join().await;

    slow.expect_closed().await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !registry.is_empty().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "evicted player still registered"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Its spawn was never announced, so no removal is owed either.
    observer.expect_silence(Duration::from_millis(200)).await;
}
