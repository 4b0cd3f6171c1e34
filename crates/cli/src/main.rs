use anyhow::Context;
use bookstore_app::Application;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about = "Run and maintain the bookstore service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize storage and serve HTTP requests (default)
    Serve,
    /// Create or upgrade the database schema, then exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!(env = ?settings.environment, "serving");
            Application::bootstrap(settings).await?.run().await
        }
        Command::Migrate => {
            let applied = Application::migrate(&settings).await?;
            tracing::info!(applied, db = %settings.database.url, "migrations complete");
            Ok(())
        }
    }
}
