//! CLI command implementations
//!
//! `serve` boot order: config → logging → storage backend → `init` →
//! key material → broker → router → listeners. On shutdown the backend is
//! disconnected before the process exits.

use crate::auth::JwtVerifier;
use crate::core::DataService;
use crate::http_server::{HttpServer, ServerConfig};
use crate::observability::init_logging;
use crate::realtime::{Broker, BrokerConfig};

use super::args::{Cli, Command, ServeArgs};
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve(args) => serve(&args),
        Command::CheckConfig(args) => check_config(&args),
    }
}

/// Validate the effective configuration and print it as JSON
pub fn check_config(args: &ServeArgs) -> CliResult<()> {
    let config = args.resolve()?;
    if config.auth_enabled {
        JwtVerifier::from_file(&config.auth_public_key)?;
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Boot and serve until Ctrl-C
pub fn serve(args: &ServeArgs) -> CliResult<()> {
    let config = args.resolve()?;
    init_logging(config.log_format, &config.log_level)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("failed to create tokio runtime: {}", e)))?;
    rt.block_on(run_server(config))
}

async fn run_server(config: ServerConfig) -> CliResult<()> {
    let db = config.database.build()?;
    db.init().await?;
    tracing::info!(driver = %config.database.driver, "storage backend ready");

    let verifier = if config.auth_enabled {
        let verifier = JwtVerifier::from_file(&config.auth_public_key)?;
        tracing::info!(key = %config.auth_public_key.display(), "authentication enabled");
        Some(verifier)
    } else {
        None
    };

    let broker = if config.broker_enabled {
        Broker::new(BrokerConfig::default())
    } else {
        Broker::disabled()
    };

    let service = DataService::new(db.clone(), broker, config.auth_enabled);
    let result = HttpServer::new(config, service, verifier).start().await;

    db.disconnect().await;
    tracing::info!("storage backend disconnected");
    result.map_err(|e| CliError::serve_failed(e.to_string()))
}
