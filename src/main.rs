mod app;
mod cli;
mod configuration;
mod context;
mod core;
mod report;
mod repository;
mod resolver;
mod scanner;
mod tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
