use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use pgmerge::commands::{self, OutputFormat};
use pgmerge::config::{self, ConfigBuilder, ConfigInput};
use pgmerge::constants::CONFIG_FILENAME;
use pgmerge::MergeError;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge source schemas into a target schema
    Merge {
        /// Source schemas, highest priority first
        #[arg(required = true)]
        sources: Vec<String>,

        /// Schema to merge into
        #[arg(long, short = 't')]
        target: String,

        #[command(flatten)]
        merge_args: config::MergeArgs,

        #[command(flatten)]
        table_filter_args: config::TableFilterArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List the tables of a schema
    Tables {
        schema: String,

        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Compare the table sets of two schemas
    Compare {
        a: String,
        b: String,

        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List user schemas with table counts and sizes
    Schemas {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Show recorded merges, newest first
    History {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Drop a schema and its merge history
    Drop {
        schema: String,

        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);

    let succeeded = tokio::select! {
        result = run_main(cli) => match result {
            Ok(succeeded) => succeeded,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                false
            }
        },
        _ = wait_for_shutdown_signal() => {
            info!("Received shutdown signal, rolling back...");
            eprintln!("❌ {}", MergeError::Cancelled.labelled());
            false
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_main(cli: Cli) -> Result<bool> {
    let file_config = config::load_config(&cli.config_file)?;

    let mut cli_config = ConfigInput {
        database: Some(cli.database_args.clone().into()),
        ..Default::default()
    };
    if let Commands::Merge {
        merge_args,
        table_filter_args,
        ..
    } = &cli.command
    {
        cli_config.merge = Some(merge_args.clone().into());
        cli_config.audit = Some(merge_args.clone().into());
        cli_config.tables = Some(table_filter_args.clone().into());
    }

    let config = ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(cli_config)
        .resolve()?;

    match &cli.command {
        Commands::Merge {
            sources,
            target,
            format,
            ..
        } => {
            info!("Merging {} into {}", sources.join(", "), target);
            commands::cmd_merge(&config, sources, target, *format).await
        }
        Commands::Tables { schema, format } => {
            commands::cmd_tables(&config, schema, *format).await
        }
        Commands::Compare { a, b, format } => {
            commands::cmd_compare(&config, a, b, *format).await
        }
        Commands::Schemas { format } => commands::cmd_schemas(&config, *format).await,
        Commands::History { format } => commands::cmd_history(&config, *format).await,
        Commands::Drop { schema, yes } => commands::cmd_drop(&config, schema, *yes).await,
    }
}
