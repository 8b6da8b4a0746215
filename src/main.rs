use anyhow::Result;
use ragchat::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
