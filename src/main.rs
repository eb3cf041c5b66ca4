use anyhow::Result;
use echo::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
