//! pg-schema-sync CLI - PostgreSQL schema comparison and sync script generation.

use clap::{Parser, Subcommand};
use pg_schema_sync::drivers::files::FileSource;
use pg_schema_sync::drivers::postgres::PostgresSource;
use pg_schema_sync::{
    write_script_file, Config, Generator, SchemaSource, SyncError, SyncOptions, SyncOrchestrator,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pg-schema-sync")]
#[command(about = "Compare two PostgreSQL schemas and generate a sync script")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare source and target schemas and emit a sync script
    Sync {
        /// Read the source schema from a directory of generated files
        /// instead of a live database
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Read the target schema from a directory of generated files
        /// instead of a live database
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// Override source schema name
        #[arg(long)]
        source_schema: Option<String>,

        /// Override target schema name
        #[arg(long)]
        target_schema: Option<String>,

        /// Write the script to this file (parent directories are created)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the script to stdout even when an output file is configured
        #[arg(long)]
        stdout: bool,
    },

    /// Introspect one database and generate schema definition files
    Gen {
        /// Directory for schema.sql, procs.sql, and triggers.sql
        #[arg(short, long, default_value = "schema")]
        output_dir: PathBuf,

        /// Override the schema to introspect
        #[arg(long)]
        schema: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| SyncError::Config(e.to_string()))?;

    match cli.command {
        Commands::Sync {
            source_dir,
            target_dir,
            source_schema,
            target_schema,
            output,
            stdout,
        } => {
            let file_mode = source_dir.is_some() || target_dir.is_some();
            if file_mode && (source_dir.is_none() || target_dir.is_none()) {
                return Err(SyncError::Config(
                    "--source-dir and --target-dir must be given together".into(),
                ));
            }

            let (source, target, options, configured_output): (
                Box<dyn SchemaSource>,
                Box<dyn SchemaSource>,
                SyncOptions,
                Option<PathBuf>,
            ) = if file_mode {
                let source = FileSource::open(source_dir.unwrap())?;
                let target = FileSource::open(target_dir.unwrap())?;
                let options = SyncOptions {
                    source_schema: source_schema.unwrap_or_else(|| "public".to_string()),
                    target_schema: target_schema.unwrap_or_else(|| "public".to_string()),
                };
                (Box::new(source), Box::new(target), options, None)
            } else {
                let mut config = Config::load(&cli.config)?;
                info!("Loaded configuration from {:?}", cli.config);

                if let Some(schema) = source_schema {
                    config.source.schema = schema;
                }
                if let Some(schema) = target_schema {
                    config.target.schema = schema;
                }

                let max_conns = config.sync.max_connections;
                let source = PostgresSource::connect(&config.source, max_conns).await?;
                let target = PostgresSource::connect(&config.target, max_conns).await?;
                let options = SyncOptions {
                    source_schema: config.source.schema.clone(),
                    target_schema: config.target.schema.clone(),
                };
                (
                    Box::new(source),
                    Box::new(target),
                    options,
                    config.sync.output.clone(),
                )
            };

            let orchestrator = SyncOrchestrator::new(source, target, options);
            let report = orchestrator.run().await?;

            let output = output.or(configured_output);
            match output {
                Some(ref path) if !stdout => write_script_file(&report.script, path)?,
                _ => print!("{}", report.script),
            }

            eprintln!("\nSync comparison completed!");
            eprintln!("  Duration: {:.2}s", report.duration_seconds);
            eprintln!("  Statements: {}", report.statements);
            for phase in &report.phases {
                eprintln!(
                    "  {}: +{} -{} ~{}",
                    phase.phase, phase.created, phase.dropped, phase.modified
                );
            }
            if report.is_in_sync() {
                eprintln!("  Schemas are already in sync.");
            }
        }

        Commands::Gen { output_dir, schema } => {
            let mut config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);

            if let Some(schema) = schema {
                config.source.schema = schema;
            }

            let source =
                PostgresSource::connect(&config.source, config.sync.max_connections).await?;
            let generator = Generator::new(
                Box::new(source),
                config.source.schema.clone(),
                output_dir,
            );
            let report = generator.run().await?;

            eprintln!("\nGeneration completed!");
            eprintln!("  Tables: {}", report.tables);
            eprintln!("  Sequences: {}", report.sequences);
            eprintln!("  Functions: {}", report.functions);
            eprintln!("  Triggers: {}", report.triggers);
            for file in &report.files {
                eprintln!("  Wrote {}", file.display());
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
