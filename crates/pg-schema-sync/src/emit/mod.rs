//! Script assembly and the safe-mutation policy.
//!
//! Every "drop" result for an object that carries data (tables, columns,
//! constraints, routines) is rewritten as a rename-to-backup plus a TODO
//! review marker; only triggers and indexes are dropped directly. The
//! per-phase emitters in the submodules produce statement text; this
//! module assembles the final script document.

pub mod columns;
pub mod constraints;
pub mod indexes;
pub mod routines;
pub mod tables;
pub mod triggers;

use chrono::Utc;

use crate::core::identifier::quote_ident;

/// Width of the `=` rule under each section heading.
const RULE_WIDTH: usize = 60;

/// The six ordered diff phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Tables,
    Columns,
    Routines,
    Constraints,
    Indexes,
    Triggers,
}

impl Phase {
    /// Phases in execution order.
    pub const ORDER: [Phase; 6] = [
        Phase::Tables,
        Phase::Columns,
        Phase::Routines,
        Phase::Constraints,
        Phase::Indexes,
        Phase::Triggers,
    ];

    /// Section heading in the generated script.
    pub fn heading(&self) -> &'static str {
        match self {
            Phase::Tables => "TABLE OPERATIONS",
            Phase::Columns => "COLUMN OPERATIONS",
            Phase::Routines => "FUNCTION/PROCEDURE OPERATIONS",
            Phase::Constraints => "CONSTRAINT OPERATIONS",
            Phase::Indexes => "INDEX OPERATIONS",
            Phase::Triggers => "TRIGGER OPERATIONS",
        }
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Tables => "tables",
            Phase::Columns => "columns",
            Phase::Routines => "routines",
            Phase::Constraints => "constraints",
            Phase::Indexes => "indexes",
            Phase::Triggers => "triggers",
        }
    }
}

/// Backup name for a renamed-instead-of-dropped object.
pub fn backup_name(original: &str, timestamp: i64) -> String {
    format!("{}_backup_{}", original, timestamp)
}

/// A TODO comment line requiring manual follow-up.
pub fn todo_comment(message: &str) -> String {
    format!("-- TODO: {}", message)
}

/// Review marker attached to every rename-to-backup statement.
pub fn backup_review_comment(kind: &str, qualified_backup: &str) -> String {
    todo_comment(&format!(
        "verify data, then drop the backup {} {} manually",
        kind, qualified_backup
    ))
}

/// Render a column list for DDL: quoted, comma separated.
pub fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Assembles the sync script document section by section.
pub struct ScriptBuilder {
    out: String,
    statement_count: usize,
}

impl ScriptBuilder {
    /// Start a new script with the standard header block.
    pub fn new(source_schema: &str, target_schema: &str) -> Self {
        let mut out = String::new();
        out.push_str("-- Schema Sync Script\n");
        out.push_str(&format!("-- Source schema: {}\n", source_schema));
        out.push_str(&format!("-- Target schema: {}\n", target_schema));
        out.push_str(&format!("-- Generated: {}\n", Utc::now().to_rfc3339()));
        out.push('\n');
        Self {
            out,
            statement_count: 0,
        }
    }

    /// Append one labeled phase section.
    pub fn push_section(&mut self, phase: Phase, statements: &[String]) {
        self.out.push_str(&format!("-- {}\n", phase.heading()));
        self.out.push_str(&format!("-- {}\n", "=".repeat(RULE_WIDTH)));

        if statements.is_empty() {
            self.out.push_str("-- No changes detected.\n");
        } else {
            for stmt in statements {
                self.out.push('\n');
                self.out.push_str(stmt);
                self.out.push('\n');
                self.statement_count += 1;
            }
        }
        self.out.push('\n');
    }

    /// Number of statements pushed so far.
    pub fn statement_count(&self) -> usize {
        self.statement_count
    }

    /// Finish the document with the closing marker.
    pub fn finish(mut self) -> String {
        self.out.push_str("-- END OF SCHEMA SYNC SCRIPT\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_name() {
        assert_eq!(backup_name("users", 1700000000), "users_backup_1700000000");
    }

    #[test]
    fn test_script_document_format() {
        let mut builder = ScriptBuilder::new("app", "app_copy");
        builder.push_section(Phase::Tables, &["CREATE TABLE t (id integer);".to_string()]);
        builder.push_section(Phase::Columns, &[]);
        let script = builder.finish();

        assert!(script.starts_with("-- Schema Sync Script\n"));
        assert!(script.contains("-- Source schema: app\n"));
        assert!(script.contains("-- Target schema: app_copy\n"));
        assert!(script.contains("-- Generated: "));
        assert!(script.contains("-- TABLE OPERATIONS\n"));
        assert!(script.contains(&format!("-- {}\n", "=".repeat(60))));
        assert!(script.contains("CREATE TABLE t (id integer);"));
        assert!(script.contains("-- COLUMN OPERATIONS\n"));
        assert!(script.contains("-- No changes detected."));
        assert!(script.ends_with("-- END OF SCHEMA SYNC SCRIPT\n"));
    }

    #[test]
    fn test_statement_count_ignores_empty_sections() {
        let mut builder = ScriptBuilder::new("a", "b");
        builder.push_section(Phase::Tables, &[]);
        assert_eq!(builder.statement_count(), 0);
        builder.push_section(Phase::Indexes, &["DROP INDEX i;".to_string()]);
        assert_eq!(builder.statement_count(), 1);
    }

    #[test]
    fn test_phase_order_matches_pipeline() {
        let labels: Vec<_> = Phase::ORDER.iter().map(|p| p.label()).collect();
        assert_eq!(
            labels,
            vec!["tables", "columns", "routines", "constraints", "indexes", "triggers"]
        );
    }
}
