//! crm-insight - natural-language analytics over a CRM database.

use std::sync::Arc;

use anyhow::Context;
use crm_insight::cli::{Cli, Command};
use crm_insight::logging::{init_file_logging, init_stderr_logging};
use crm_insight::query::QueryResponse;
use crm_insight::server;
use crm_insight::service::QueryService;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    match cli.log_file() {
        Some(path) => init_file_logging(&path),
        None => init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli
        .resolve_config()
        .with_context(|| format!("Failed to load config from {}", cli.config_path().display()))?;
    let config = Arc::new(config);
    info!("Text generation provider: {}", config.llm.provider);

    let service = QueryService::from_config(Arc::clone(&config))
        .context("Failed to initialize the query service")?;

    match cli.command {
        Command::Serve { .. } => {
            server::serve(service, &config.server.bind).await?;
        }
        Command::Query { query, .. } => {
            match service.process_query(&query, Some(&config.database)).await? {
                QueryResponse::File(file) => println!("{}", file.path.display()),
                QueryResponse::Payload(payload) => {
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
            }
        }
        Command::Analyze { query, .. } => {
            let outcome = service.analyze(&query).await?;
            println!("{}", outcome.summary);
        }
    }

    Ok(())
}
