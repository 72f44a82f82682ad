//! Sync orchestrator: runs the six diff phases in order and assembles the
//! script.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::core::schema::{ColumnDef, ConstraintDef, IndexDef, TableDef};
use crate::core::traits::SchemaSource;
use crate::diff::signature::{
    column_key, column_signature, constraint_key, constraint_signature, function_key,
    function_signature, index_key, table_key, trigger_key, trigger_signature,
};
use crate::diff::{diff_objects, DiffSet};
use crate::emit::{self, Phase, ScriptBuilder};
use crate::error::{Result, SyncError};

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Schema to read from the source.
    pub source_schema: String,
    /// Schema to read from (and write DDL against) the target.
    pub target_schema: String,
}

/// Per-phase change counts.
#[derive(Debug, Clone)]
pub struct PhaseCount {
    pub phase: &'static str,
    pub created: usize,
    pub dropped: usize,
    pub modified: usize,
}

/// Result of a sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The assembled script document.
    pub script: String,
    /// Change counts per phase, in phase order.
    pub phases: Vec<PhaseCount>,
    /// Total emitted statements.
    pub statements: usize,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

impl SyncReport {
    /// Whether the two schemas were already identical.
    pub fn is_in_sync(&self) -> bool {
        self.statements == 0
    }
}

/// Drives the six phases against two metadata sources.
///
/// Phases run strictly in sequence; each one fetches fresh metadata from
/// both sources, so later phases see the object set the earlier phases
/// diffed. Connections are released unconditionally when the run ends,
/// also when a phase fails.
pub struct SyncOrchestrator {
    source: Box<dyn SchemaSource>,
    target: Box<dyn SchemaSource>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        source: Box<dyn SchemaSource>,
        target: Box<dyn SchemaSource>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    /// Run all phases and release both sources.
    pub async fn run(self) -> Result<SyncReport> {
        let result = self.run_phases().await;

        // Teardown must not be skipped on failure.
        self.source.close().await;
        self.target.close().await;

        result
    }

    async fn run_phases(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let src = &self.options.source_schema;
        let tgt = &self.options.target_schema;

        if !self.source.schema_exists(src).await? {
            return Err(SyncError::validation(
                src.clone(),
                format!("schema not found at {}", self.source.name()),
                "check the schema name or create the schema first",
            ));
        }
        if !self.target.schema_exists(tgt).await? {
            return Err(SyncError::validation(
                tgt.clone(),
                format!("schema not found at {}", self.target.name()),
                "check the schema name or create the schema first",
            ));
        }

        // One timestamp per run so every backup object shares the suffix.
        let timestamp = Utc::now().timestamp();
        let mut builder = ScriptBuilder::new(src, tgt);
        let mut phases = Vec::with_capacity(Phase::ORDER.len());

        for phase in Phase::ORDER {
            let statements = match phase {
                Phase::Tables => self.phase_tables(&mut phases, timestamp).await?,
                Phase::Columns => self.phase_columns(&mut phases, timestamp).await?,
                Phase::Routines => self.phase_routines(&mut phases, timestamp).await?,
                Phase::Constraints => self.phase_constraints(&mut phases, timestamp).await?,
                Phase::Indexes => self.phase_indexes(&mut phases).await?,
                Phase::Triggers => self.phase_triggers(&mut phases).await?,
            };
            builder.push_section(phase, &statements);
        }

        let statements = builder.statement_count();
        let report = SyncReport {
            script: builder.finish(),
            phases,
            statements,
            duration_seconds: started.elapsed().as_secs_f64(),
        };

        info!(
            "Sync comparison finished: {} statements in {:.2}s",
            report.statements, report.duration_seconds
        );
        Ok(report)
    }

    async fn phase_tables(
        &self,
        phases: &mut Vec<PhaseCount>,
        timestamp: i64,
    ) -> Result<Vec<String>> {
        let (source_tables, target_tables) = self.fetch_tables().await?;
        if source_tables.is_empty() {
            warn!(
                "Source schema '{}' has no tables; every target table will be renamed away",
                self.options.source_schema
            );
        }

        let diff = diff_objects(&source_tables, &target_tables, table_key, |_| ());
        record(phases, Phase::Tables, &diff);
        Ok(emit::tables::emit(
            &diff,
            &self.options.target_schema,
            timestamp,
        ))
    }

    async fn phase_columns(
        &self,
        phases: &mut Vec<PhaseCount>,
        timestamp: i64,
    ) -> Result<Vec<String>> {
        let (source_tables, target_tables) = self.fetch_tables().await?;
        let common = common_tables(&source_tables, &target_tables);

        // Columns of tables that exist on only one side are handled
        // wholesale at the table level; diffing them here would emit
        // spurious per-column statements.
        let source_cols = flatten_columns(&source_tables, &common);
        let target_cols = flatten_columns(&target_tables, &common);

        let diff = diff_objects(&source_cols, &target_cols, column_key, column_signature);
        record(phases, Phase::Columns, &diff);
        Ok(emit::columns::emit(
            &diff,
            &self.options.target_schema,
            timestamp,
        ))
    }

    async fn phase_routines(
        &self,
        phases: &mut Vec<PhaseCount>,
        timestamp: i64,
    ) -> Result<Vec<String>> {
        let source_fns = self
            .source
            .list_functions(&self.options.source_schema)
            .await?;
        let target_fns = self
            .target
            .list_functions(&self.options.target_schema)
            .await?;

        let schemas = [
            self.options.source_schema.as_str(),
            self.options.target_schema.as_str(),
        ];
        let diff = diff_objects(&source_fns, &target_fns, function_key, |f| {
            function_signature(f, &schemas)
        });
        record(phases, Phase::Routines, &diff);
        Ok(emit::routines::emit(
            &diff,
            &self.options.target_schema,
            timestamp,
        ))
    }

    async fn phase_constraints(
        &self,
        phases: &mut Vec<PhaseCount>,
        timestamp: i64,
    ) -> Result<Vec<String>> {
        let (source_tables, target_tables) = self.fetch_tables().await?;
        let common = common_tables(&source_tables, &target_tables);

        // Constraints of new source tables are created here (their tables
        // exist once the tables phase ran). Target constraints on renamed
        // tables left with the rename and must not be touched again.
        let source_constraints = flatten_constraints(&source_tables, None);
        let target_constraints = flatten_constraints(&target_tables, Some(&common));

        let diff = diff_objects(
            &source_constraints,
            &target_constraints,
            constraint_key,
            constraint_signature,
        );
        record(phases, Phase::Constraints, &diff);
        Ok(emit::constraints::emit(
            &diff,
            &self.options.target_schema,
            timestamp,
        ))
    }

    async fn phase_indexes(&self, phases: &mut Vec<PhaseCount>) -> Result<Vec<String>> {
        let (source_tables, target_tables) = self.fetch_tables().await?;
        let common = common_tables(&source_tables, &target_tables);

        let source_indexes = flatten_indexes(&source_tables, None);
        let target_indexes = flatten_indexes(&target_tables, Some(&common));

        let diff = diff_objects(&source_indexes, &target_indexes, index_key, |_| ());
        record(phases, Phase::Indexes, &diff);
        Ok(emit::indexes::emit(&diff, &self.options.target_schema))
    }

    async fn phase_triggers(&self, phases: &mut Vec<PhaseCount>) -> Result<Vec<String>> {
        let source_triggers = self
            .source
            .list_triggers(&self.options.source_schema)
            .await?;
        let mut target_triggers = self
            .target
            .list_triggers(&self.options.target_schema)
            .await?;

        // Triggers on renamed-away tables left with the rename.
        let (source_tables, target_tables) = self.fetch_tables().await?;
        let common = common_tables(&source_tables, &target_tables);
        target_triggers.retain(|t| common.contains(t.table.as_str()));

        let diff = diff_objects(
            &source_triggers,
            &target_triggers,
            trigger_key,
            trigger_signature,
        );
        record(phases, Phase::Triggers, &diff);
        Ok(emit::triggers::emit(&diff, &self.options.target_schema))
    }

    async fn fetch_tables(&self) -> Result<(Vec<TableDef>, Vec<TableDef>)> {
        let source = self
            .source
            .list_tables(&self.options.source_schema)
            .await?;
        let target = self
            .target
            .list_tables(&self.options.target_schema)
            .await?;
        Ok((source, target))
    }
}

fn record<T>(phases: &mut Vec<PhaseCount>, phase: Phase, diff: &DiffSet<T>) {
    let (created, dropped, modified) = diff.counts();
    info!(
        "Phase {}: {} to create, {} to drop, {} to modify",
        phase.label(),
        created,
        dropped,
        modified
    );
    phases.push(PhaseCount {
        phase: phase.label(),
        created,
        dropped,
        modified,
    });
}

fn common_tables<'a>(source: &'a [TableDef], target: &'a [TableDef]) -> HashSet<&'a str> {
    let source_names: HashSet<&str> = source.iter().map(|t| t.name.as_str()).collect();
    target
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| source_names.contains(name))
        .collect()
}

fn flatten_columns(tables: &[TableDef], keep: &HashSet<&str>) -> Vec<ColumnDef> {
    tables
        .iter()
        .filter(|t| keep.contains(t.name.as_str()))
        .flat_map(|t| t.columns.iter().cloned())
        .collect()
}

fn flatten_constraints(tables: &[TableDef], keep: Option<&HashSet<&str>>) -> Vec<ConstraintDef> {
    tables
        .iter()
        .filter(|t| keep.map_or(true, |k| k.contains(t.name.as_str())))
        .flat_map(|t| t.constraints.iter().cloned())
        .collect()
}

fn flatten_indexes(tables: &[TableDef], keep: Option<&HashSet<&str>>) -> Vec<IndexDef> {
    tables
        .iter()
        .filter(|t| keep.map_or(true, |k| k.contains(t.name.as_str())))
        .flat_map(|t| t.indexes.iter().cloned())
        .collect()
}

/// Write the script to a file, creating parent directories as needed.
pub fn write_script_file(script: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, script)?;
    info!("Wrote sync script to {}", path.display());
    Ok(())
}
