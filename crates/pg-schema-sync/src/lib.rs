//! # pg-schema-sync
//!
//! Compares the structure of two PostgreSQL schemas and produces an
//! ordered SQL script that transforms the target schema into the shape of
//! the source schema. Also generates schema definition files
//! (schema/procedures/triggers) from a live database.
//!
//! Destructive operations are never emitted directly: objects that carry
//! data are renamed to timestamped backup names with TODO review markers,
//! so the generated script is safe to hand to a human reviewer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_schema_sync::{Config, SyncOptions, SyncOrchestrator};
//! use pg_schema_sync::drivers::postgres::PostgresSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let source = PostgresSource::connect(&config.source, 4).await?;
//!     let target = PostgresSource::connect(&config.target, 4).await?;
//!
//!     let orchestrator = SyncOrchestrator::new(
//!         Box::new(source),
//!         Box::new(target),
//!         SyncOptions {
//!             source_schema: config.source.schema.clone(),
//!             target_schema: config.target.schema.clone(),
//!         },
//!     );
//!     let report = orchestrator.run().await?;
//!     println!("{}", report.script);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod diff;
pub mod drivers;
pub mod emit;
pub mod error;
pub mod generate;
pub mod orchestrator;

// Re-exports for convenient access
pub use crate::core::schema::{
    ColumnDef, ConstraintDef, ConstraintKind, FunctionDef, IndexDef, SequenceDef, TableDef,
    TriggerDef,
};
pub use crate::core::traits::SchemaSource;
pub use config::{Config, EndpointConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use generate::{GenReport, Generator};
pub use orchestrator::{write_script_file, SyncOptions, SyncOrchestrator, SyncReport};
