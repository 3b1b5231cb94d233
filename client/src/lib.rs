//! Entry point glue for the greeting client.

use frontend::{mount_placeholder, Document};
use log::{debug, info};
use net::{greet, Outcome, SessionConfig, SessionReport};

/// Install `env_logger`, defaulting to `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()?;
    Ok(())
}

/// Build the placeholder view.
pub fn show_placeholder() -> anyhow::Result<Document> {
    let mut doc = Document::new();
    mount_placeholder(&mut doc);
    debug!("view: {}", doc.to_json()?);
    Ok(doc)
}

/// Mount the view, then run the one network session to completion.
pub async fn run(config: SessionConfig) -> anyhow::Result<SessionReport> {
    show_placeholder()?;
    let report = greet(config).await;
    match &report.outcome {
        Outcome::Replied(_) => info!("session finished after reply"),
        Outcome::PeerClosed => info!("session finished, server hung up"),
        Outcome::Failed(err) => info!("session failed: {err}"),
    }
    Ok(report)
}
