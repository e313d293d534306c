#[tokio::main]
async fn main() -> std::io::Result<()> {
    central_server::run_with_config().await
}
