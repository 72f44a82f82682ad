//! Metadata acquisition interface.
//!
//! The diff and emission core consumes schema metadata exclusively through
//! [`SchemaSource`], so a live database and a parsed set of previously
//! generated files are interchangeable. Only acquisition differs between
//! adapters; everything downstream is identical and testable offline.

use async_trait::async_trait;

use crate::core::schema::{FunctionDef, SequenceDef, TableDef, TriggerDef};
use crate::error::Result;

/// Read schema metadata for one schema from some backing source.
///
/// Implementations return fully populated descriptors: tables carry their
/// columns, constraints, indexes, and owned sequences.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Short label identifying the adapter and its target, for logs and
    /// error context (e.g., "postgres://host/db" or "dir:./schema").
    fn name(&self) -> String;

    /// Whether the schema exists at the source.
    async fn schema_exists(&self, schema: &str) -> Result<bool>;

    /// List tables with columns, constraints, indexes, and sequences.
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableDef>>;

    /// List functions and procedures with parameters and bodies.
    async fn list_functions(&self, schema: &str) -> Result<Vec<FunctionDef>>;

    /// List user triggers.
    async fn list_triggers(&self, schema: &str) -> Result<Vec<TriggerDef>>;

    /// List sequences. Used only by the generation pipeline.
    async fn list_sequences(&self, schema: &str) -> Result<Vec<SequenceDef>>;

    /// Release any held resources (connection pools). Must be called
    /// unconditionally, also on failed runs.
    async fn close(&self);
}
