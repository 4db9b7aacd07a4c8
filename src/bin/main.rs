//! Binary entrypoint for the outliner tool

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    outliner::cli::run().await
}
