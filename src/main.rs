#[tokio::main]
async fn main() -> std::io::Result<()> {
    drive_relay::run_with_config().await
}
