mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::WrapErr};

use crate::{
    config::Config,
    database::Database,
    http_server::app::HttpServerConfig,
    logging::init_tracing,
    services::{error::ServiceError, user::UserService},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "CINEMA_BOOKING_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `cinema_booking=debug,tower_http=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Export spans over OTLP/gRPC to this endpoint
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "8000", env = "CINEMA_BOOKING_HTTP_PORT")]
        port: u16,

        /// Orders per page, overrides the config file
        #[arg(long, env = "CINEMA_BOOKING_ORDERS_PAGE_SIZE")]
        orders_page_size: Option<u64>,
    },
    /// Create an API user and print its token
    CreateUser {
        #[arg(short, long)]
        username: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(&args.log_level, args.otlp_endpoint.as_deref())?;

    let result = run(args).await;

    if let Some(tracer_provider) = tracer_provider
        && let Err(err) = tracer_provider.shutdown()
    {
        log::warn!("Failed to flush traces: {err}");
    }

    result
}

async fn run(args: Args) -> Result<()> {
    log::debug!("Cinema booking starting");

    // Config commands must work before any config file exists
    if let Commands::Config(config_commands) = &args.command {
        match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                log::info!("Default config available at: {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        }
        return Ok(());
    }

    log::debug!("Loading configuration");
    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load cinema-booking config")?;

    let database = Arc::new(Database::open(&config.database_path()).await?);

    match args.command {
        Commands::Serve {
            port,
            orders_page_size,
        } => {
            let orders_page_size = orders_page_size
                .map(|size| size.max(1))
                .unwrap_or_else(|| config.orders_page_size());
            log::info!("Starting HTTP server on port: {}", port);
            http_server::app::start(HttpServerConfig {
                port,
                database,
                orders_page_size,
            })
            .await?;
        }
        Commands::CreateUser { username } => {
            let user = match UserService::new(database).create_user(&username).await {
                Ok(user) => user,
                Err(ServiceError::Validation(errors)) => {
                    return Err(color_eyre::eyre::eyre!(
                        "Cannot create user {username}: {}",
                        serde_json::to_string(&errors)?
                    ));
                }
                Err(err) => return Err(err).wrap_err("Failed to create user"),
            };
            log::info!("Created user {} ({})", user.username, user.id);
            println!("{}", user.token);
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
