use net::SessionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    client::init_logging()?;
    client::run(SessionConfig::default()).await?;
    Ok(())
}
