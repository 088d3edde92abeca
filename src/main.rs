use anyhow::Result;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    roamer::cli::run().await
}
