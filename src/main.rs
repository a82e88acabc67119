use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use sentiment_analysis::app::{router, AppState};
use sentiment_analysis::config::{Config, Environment};
use sentiment_analysis::database::init_db;
use sentiment_analysis::pipeline::{initialize, Dataset, ModelTrainer};

#[derive(Parser, Debug)]
#[command(name = "sentiment-analysis")]
#[command(author, version, about = "Sentiment analysis REST service backed by a linear SVM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Retrain the model and print the evaluation report
    Train {
        /// CSV dataset to train on; overrides DATASET_PATH
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Skip writing the model artifact
        #[arg(long, default_value = "false")]
        no_save: bool,
    },
}

fn init_tracing(environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    match environment {
        Environment::Production => builder.json().init(),
        Environment::Development => builder.init(),
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// `sqlite://data/app.db` -> `data/app.db`; `None` for in-memory databases.
fn sqlite_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty() && !path.contains(":memory:")).then(|| Path::new(path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.environment);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Train { dataset, no_save } => train(config, dataset, no_save),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Initializing sentiment analysis system...");

    if let Some(db_file) = sqlite_file(&config.database_url) {
        ensure_parent_dir(db_file)?;
    }
    ensure_parent_dir(&config.model.model_path)?;

    let pool = init_db(&config.database_url)
        .await
        .context("Failed to initialize the database")?;

    let analyzer = initialize(config.model.clone(), config.dataset.clone())
        .await
        .context("Failed to initialize the sentiment model")?;
    tracing::info!(info = ?analyzer.info(), "Model ready");

    let app = router(AppState::new(pool, analyzer, config.text));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;
    tracing::info!("Server listening on http://{addr}");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

fn train(config: Config, dataset_path: Option<PathBuf>, no_save: bool) -> anyhow::Result<()> {
    let mut dataset_config = config.dataset.clone();
    if let Some(path) = dataset_path {
        dataset_config.path = path;
    }

    let dataset = Dataset::load(&dataset_config).context("Failed to load dataset")?;
    let mut trainer = ModelTrainer::new(config.model.clone());
    let metrics = trainer.train(&dataset).context("Training failed")?;

    println!("{metrics}");

    if !no_save {
        trainer.save().context("Failed to save the model")?;
        tracing::info!(path = %config.model.model_path.display(), "Model saved");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file() {
        assert_eq!(
            sqlite_file("sqlite://data/sentiment_analysis.db"),
            Some(Path::new("data/sentiment_analysis.db"))
        );
        assert_eq!(
            sqlite_file("sqlite:app.db?mode=rwc"),
            Some(Path::new("app.db"))
        );
        assert_eq!(sqlite_file("sqlite::memory:"), None);
        assert_eq!(sqlite_file("postgres://localhost/db"), None);
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::parse_from(["sentiment-analysis"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["sentiment-analysis", "train", "--no-save"]);
        assert!(matches!(cli.command, Some(Command::Train { no_save: true, dataset: None })));
    }

    #[test]
    fn test_help_and_bad_arguments_stop_before_config() {
        let err = Cli::try_parse_from(["sentiment-analysis", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["sentiment-analysis", "retrain"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
