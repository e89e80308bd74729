//! SecureVote Server binary
//!
//! Reads `server.{toml,yaml,json}` and `SECUREVOTE_SERVER__*` environment
//! variables, then serves until shut down.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();

    let config = ServerConfig::load()?;
    server::start_server(config).await?;

    Ok(())
}
