use clap::Parser;
use std::process::ExitCode;
use url_classifier::cli::Cli;
use url_classifier::server::{self, AppState};
use url_classifier::UrlClassifier;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("url_classifier=info")),
        )
        .init();

    let cli = Cli::parse();
    let options = match cli.load_options() {
        Ok(options) => options,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let model = match UrlClassifier::load(&cli.model_dir, options) {
        Ok(model) => model,
        Err(err) => {
            tracing::error!("failed to load model from {}: {}", cli.model_dir.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let addr = cli.addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind {}: {}", addr, err);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on {}", addr);

    if let Err(err) = server::serve(listener, AppState::new(model)).await {
        tracing::error!("server error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
