//! Interview Insights - interview experience ingestion service
//!
//! Accepts interview write-ups over HTTP, enriches them with an external NLP
//! analyzer and keeps them in a JSON record store.

use interview_insights::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (INFO level by default, use RUST_LOG=debug for stage traces)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    // Run CLI
    cli::run().await
}
