//! One-way generation: introspect a live schema into SQL definition files.
//!
//! Produces the `schema.sql` / `procs.sql` / `triggers.sql` file set that
//! the files adapter can parse back, closing the loop between generation
//! and diffing.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::core::depsort::sort_by_dependency;
use crate::core::identifier::qualify;
use crate::core::schema::{SequenceDef, TableDef};
use crate::core::traits::SchemaSource;
use crate::drivers::files::{PROCS_FILE, SCHEMA_FILE, TRIGGERS_FILE};
use crate::emit::{constraints, indexes, routines, tables, triggers};
use crate::error::{Result, SyncError};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenReport {
    pub tables: usize,
    pub sequences: usize,
    pub functions: usize,
    pub triggers: usize,
    pub files: Vec<PathBuf>,
}

/// Generates schema definition files from one metadata source.
pub struct Generator {
    source: Box<dyn SchemaSource>,
    schema: String,
    out_dir: PathBuf,
}

impl Generator {
    pub fn new(source: Box<dyn SchemaSource>, schema: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            schema: schema.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Run generation and release the source.
    pub async fn run(self) -> Result<GenReport> {
        let result = self.generate().await;
        self.source.close().await;
        result
    }

    async fn generate(&self) -> Result<GenReport> {
        if !self.source.schema_exists(&self.schema).await? {
            return Err(SyncError::validation(
                self.schema.clone(),
                format!("schema not found at {}", self.source.name()),
                "check the schema name or create the schema first",
            ));
        }

        let tables = self.source.list_tables(&self.schema).await?;
        if tables.is_empty() {
            return Err(SyncError::validation(
                self.schema.clone(),
                "schema contains no tables",
                "verify the schema name and that the connecting role can see its tables",
            ));
        }

        let sequences = self.source.list_sequences(&self.schema).await?;
        let functions = self.source.list_functions(&self.schema).await?;
        let trigger_defs = self.source.list_triggers(&self.schema).await?;

        std::fs::create_dir_all(&self.out_dir)?;

        let schema_path = self.out_dir.join(SCHEMA_FILE);
        let schema_sql = render_schema_file(&self.schema, &tables, &sequences);
        std::fs::write(&schema_path, &schema_sql)?;

        let procs_path = self.out_dir.join(PROCS_FILE);
        let mut procs_sql = file_header("Stored Routines", &self.schema);
        for function in &functions {
            procs_sql.push('\n');
            procs_sql.push_str(&routines::create_or_replace(function, &self.schema));
            procs_sql.push('\n');
        }
        std::fs::write(&procs_path, &procs_sql)?;

        let triggers_path = self.out_dir.join(TRIGGERS_FILE);
        let mut triggers_sql = file_header("Triggers", &self.schema);
        for trigger in &trigger_defs {
            triggers_sql.push('\n');
            triggers_sql.push_str(&triggers::create_trigger(trigger, &self.schema));
            triggers_sql.push('\n');
        }
        std::fs::write(&triggers_path, &triggers_sql)?;

        info!(
            "Generated {} tables, {} functions, {} triggers into {}",
            tables.len(),
            functions.len(),
            trigger_defs.len(),
            self.out_dir.display()
        );

        Ok(GenReport {
            tables: tables.len(),
            sequences: sequences.len(),
            functions: functions.len(),
            triggers: trigger_defs.len(),
            files: vec![schema_path, procs_path, triggers_path],
        })
    }
}

fn file_header(title: &str, schema: &str) -> String {
    format!(
        "-- {}\n-- Schema: {}\n-- Generated: {}\n",
        title,
        schema,
        Utc::now().to_rfc3339()
    )
}

/// Render the schema.sql document: standalone sequences, dependency-ordered
/// tables, constraints, and indexes.
fn render_schema_file(schema: &str, tables: &[TableDef], sequences: &[SequenceDef]) -> String {
    let mut out = file_header("Schema Definition", schema);

    // Sequences owned by identity/serial columns are created implicitly
    // by their column definitions; only standalone ones are emitted.
    let owned: HashSet<&str> = tables
        .iter()
        .flat_map(|t| t.sequences.iter().map(|s| s.name.as_str()))
        .collect();

    for sequence in sequences.iter().filter(|s| !owned.contains(s.name.as_str())) {
        out.push('\n');
        out.push_str(&render_sequence(sequence));
        out.push('\n');
    }

    let ordered = sort_by_dependency(tables);

    for table in &ordered {
        out.push('\n');
        out.push_str(&tables::create_table(table, schema));
        out.push('\n');
    }

    // Key constraints for every table, then cross-table foreign keys.
    out.push('\n');
    for table in &ordered {
        let mut sorted: Vec<_> = table.constraints.iter().collect();
        sorted.sort_by_key(|c| constraint_rank(c));
        for constraint in sorted {
            out.push_str(&constraints::add_constraint(constraint, schema));
            out.push('\n');
        }
    }

    out.push('\n');
    for table in &ordered {
        for index in table.indexes.iter().filter(|i| !i.backs_constraint) {
            out.push_str(&indexes::create_index(index, schema));
            out.push('\n');
        }
    }

    out
}

fn constraint_rank(c: &crate::core::schema::ConstraintDef) -> u8 {
    use crate::core::schema::ConstraintKind;
    match c.kind {
        ConstraintKind::PrimaryKey => 0,
        ConstraintKind::Unique => 1,
        ConstraintKind::Check => 2,
        ConstraintKind::NotNull => 3,
        ConstraintKind::ForeignKey => 4,
    }
}

fn render_sequence(s: &SequenceDef) -> String {
    format!(
        "CREATE SEQUENCE {} AS {} START WITH {} INCREMENT BY {} MINVALUE {} MAXVALUE {} {};",
        qualify(&s.schema, &s.name),
        s.data_type,
        s.start,
        s.increment,
        s.min_value,
        s.max_value,
        if s.cycle { "CYCLE" } else { "NO CYCLE" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnDef, ConstraintDef, ConstraintKind};

    fn column(table: &str, name: &str, data_type: &str) -> ColumnDef {
        ColumnDef {
            table: table.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length: 0,
            precision: 0,
            scale: 0,
            nullable: false,
            default: None,
            identity: None,
            generated: None,
            ordinal: 1,
        }
    }

    fn pk(table: &str) -> ConstraintDef {
        ConstraintDef {
            table: table.to_string(),
            name: format!("{}_pkey", table),
            kind: ConstraintKind::PrimaryKey,
            columns: vec!["id".to_string()],
            foreign_schema: None,
            foreign_table: None,
            foreign_columns: vec![],
            update_rule: None,
            delete_rule: None,
            deferrable: false,
            check_clause: None,
        }
    }

    fn table(name: &str) -> TableDef {
        TableDef {
            schema: "app".to_string(),
            name: name.to_string(),
            columns: vec![column(name, "id", "int8")],
            constraints: vec![pk(name)],
            indexes: vec![],
            sequences: vec![],
            comment: None,
        }
    }

    #[test]
    fn test_render_schema_file_sections() {
        let tables = vec![table("users")];
        let sequences = vec![SequenceDef {
            schema: "app".to_string(),
            name: "invoice_seq".to_string(),
            data_type: "bigint".to_string(),
            start: 1000,
            increment: 1,
            min_value: 1,
            max_value: i64::MAX,
            cycle: false,
        }];

        let sql = render_schema_file("app", &tables, &sequences);
        assert!(sql.starts_with("-- Schema Definition\n-- Schema: app\n"));
        assert!(sql.contains("CREATE SEQUENCE app.invoice_seq AS bigint START WITH 1000"));
        assert!(sql.contains("CREATE TABLE app.users (\n    id bigint NOT NULL\n);"));
        assert!(sql.contains("ALTER TABLE app.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);"));
        let seq_pos = sql.find("CREATE SEQUENCE").unwrap();
        let table_pos = sql.find("CREATE TABLE").unwrap();
        let constraint_pos = sql.find("ADD CONSTRAINT").unwrap();
        assert!(seq_pos < table_pos && table_pos < constraint_pos);
    }

    #[test]
    fn test_owned_sequences_not_rendered() {
        let mut t = table("users");
        let owned = SequenceDef {
            schema: "app".to_string(),
            name: "users_id_seq".to_string(),
            data_type: "bigint".to_string(),
            start: 1,
            increment: 1,
            min_value: 1,
            max_value: i64::MAX,
            cycle: false,
        };
        t.sequences.push(owned.clone());

        let sql = render_schema_file("app", &[t], &[owned]);
        assert!(!sql.contains("CREATE SEQUENCE app.users_id_seq"));
    }

    #[test]
    fn test_render_sequence_cycle_flag() {
        let mut s = SequenceDef {
            schema: "app".to_string(),
            name: "s".to_string(),
            data_type: "integer".to_string(),
            start: 1,
            increment: 2,
            min_value: 1,
            max_value: 100,
            cycle: true,
        };
        assert!(render_sequence(&s).ends_with("MAXVALUE 100 CYCLE;"));
        s.cycle = false;
        assert!(render_sequence(&s).ends_with("NO CYCLE;"));
    }
}
