use clap::Parser;
use mixcaption::cli::{handle_batch, handle_serve, handle_test_connection, Cli, Commands};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // loaded first so RUST_LOG from .env reaches the filter
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        tracing::debug!(".env read from {}", path.display());
    }

    let cli = Cli::parse();
    let api = cli.api.to_config();
    let options = cli.dispatch.to_options();

    match cli.command {
        Commands::Serve {
            host,
            port,
            body_limit_mb,
        } => handle_serve(api, options, &host, port, body_limit_mb).await,
        Commands::Batch {
            inputs,
            prompts,
            seed,
            out,
        } => handle_batch(api, options, &inputs, prompts, seed, &out).await,
        Commands::TestConnection => handle_test_connection(api).await,
    }
}
