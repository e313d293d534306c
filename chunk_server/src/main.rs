#[tokio::main]
async fn main() -> std::io::Result<()> {
    chunk_server::run_with_config().await
}
