//! Descriptor types for database schema objects.
//!
//! These types are immutable snapshots of catalog metadata, produced by a
//! [`SchemaSource`](crate::core::traits::SchemaSource) adapter at the start
//! of a run and discarded at the end. The diff engine never mutates them.

use serde::{Deserialize, Serialize};

/// Identity column mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMode {
    /// GENERATED ALWAYS AS IDENTITY
    Always,
    /// GENERATED BY DEFAULT AS IDENTITY
    ByDefault,
}

/// Constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    NotNull,
}

impl ConstraintKind {
    /// SQL keyword spelling for the kind.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::Check => "CHECK",
            ConstraintKind::NotNull => "NOT NULL",
        }
    }

    /// Short lower-case label used in synthesized names.
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "pkey",
            ConstraintKind::ForeignKey => "fkey",
            ConstraintKind::Unique => "key",
            ConstraintKind::Check => "check",
            ConstraintKind::NotNull => "not_null",
        }
    }
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions, ordered by ordinal position.
    pub columns: Vec<ColumnDef>,

    /// Constraints owned by the table.
    pub constraints: Vec<ConstraintDef>,

    /// Indexes on the table.
    pub indexes: Vec<IndexDef>,

    /// Sequences owned by the table's identity/serial columns.
    pub sequences: Vec<SequenceDef>,

    /// Table comment.
    pub comment: Option<String>,
}

impl TableDef {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Foreign key constraints declared on this table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ConstraintDef> {
        self.constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::ForeignKey)
    }

    /// Primary key constraint, if any.
    pub fn primary_key(&self) -> Option<&ConstraintDef> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
    }
}

/// Column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Owning table name.
    pub table: String,

    /// Column name.
    pub name: String,

    /// Base data type as reported by the catalog (e.g., "varchar", "int4").
    pub data_type: String,

    /// Maximum length for string/binary types (0 = unset, -1 = unbounded).
    pub max_length: i32,

    /// Numeric precision (0 = unset).
    pub precision: i32,

    /// Numeric scale (0 = unset).
    pub scale: i32,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Default expression, if any.
    pub default: Option<String>,

    /// Identity generation mode, if the column is an identity column.
    pub identity: Option<IdentityMode>,

    /// Generation expression for GENERATED ... STORED columns.
    pub generated: Option<String>,

    /// Ordinal position (1-based).
    pub ordinal: i32,
}

/// Constraint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDef {
    /// Owning table name.
    pub table: String,

    /// Constraint name.
    pub name: String,

    /// Constraint kind.
    pub kind: ConstraintKind,

    /// Constrained column names.
    pub columns: Vec<String>,

    /// Referenced schema (FOREIGN KEY only).
    pub foreign_schema: Option<String>,

    /// Referenced table (FOREIGN KEY only).
    pub foreign_table: Option<String>,

    /// Referenced column names (FOREIGN KEY only).
    pub foreign_columns: Vec<String>,

    /// ON UPDATE action (FOREIGN KEY only).
    pub update_rule: Option<String>,

    /// ON DELETE action (FOREIGN KEY only).
    pub delete_rule: Option<String>,

    /// Whether the constraint is DEFERRABLE INITIALLY DEFERRED.
    pub deferrable: bool,

    /// CHECK expression (CHECK only).
    pub check_clause: Option<String>,
}

impl ConstraintDef {
    /// A foreign key whose referenced table is its own owning table.
    ///
    /// Self-referencing constraints must only be emitted after every table
    /// exists, so they are excluded from dependency edges and deferred.
    pub fn is_self_referencing(&self) -> bool {
        self.kind == ConstraintKind::ForeignKey
            && self.foreign_table.as_deref() == Some(self.table.as_str())
    }
}

/// Index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    /// Owning table name.
    pub table: String,

    /// Index name.
    pub name: String,

    /// Indexed column names or expressions.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,

    /// Partial index predicate (WHERE clause), without the keyword.
    pub predicate: Option<String>,

    /// Access method (btree, hash, gin, gist, ...).
    pub method: String,

    /// Whether the index backs a PRIMARY KEY or UNIQUE constraint.
    ///
    /// Such indexes are excluded from independent emission; the constraint
    /// DDL creates them implicitly.
    pub backs_constraint: bool,
}

/// Routine parameter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    In,
    Out,
    InOut,
    Variadic,
}

impl ParamMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ParamMode::In => "IN",
            ParamMode::Out => "OUT",
            ParamMode::InOut => "INOUT",
            ParamMode::Variadic => "VARIADIC",
        }
    }
}

/// Routine parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    /// Parameter name (may be empty for positional parameters).
    pub name: String,

    /// Parameter data type.
    pub data_type: String,

    /// Parameter mode.
    pub mode: ParamMode,

    /// Default expression, if any.
    pub default: Option<String>,
}

/// Routine volatility class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Volatility {
    Volatile,
    Stable,
    Immutable,
}

impl Volatility {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Volatility::Volatile => "VOLATILE",
            Volatility::Stable => "STABLE",
            Volatility::Immutable => "IMMUTABLE",
        }
    }
}

/// Function or procedure metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Schema name.
    pub schema: String,

    /// Routine name.
    pub name: String,

    /// Ordered parameter list.
    pub params: Vec<ParamDef>,

    /// Return type. `"void"` denotes a procedure.
    pub returns: String,

    /// Implementation language (plpgsql, sql, ...).
    pub language: String,

    /// Body text, without dollar quoting.
    pub body: String,

    /// Volatility class.
    pub volatility: Volatility,

    /// Whether the routine is SECURITY DEFINER.
    pub security_definer: bool,

    /// Routine comment.
    pub comment: Option<String>,
}

impl FunctionDef {
    /// Whether this routine is a procedure rather than a function.
    pub fn is_procedure(&self) -> bool {
        self.returns.eq_ignore_ascii_case("void")
    }

    /// Routine kind label used in diff identity keys and log lines.
    pub fn kind(&self) -> &'static str {
        if self.is_procedure() {
            "procedure"
        } else {
            "function"
        }
    }
}

/// Trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
            TriggerEvent::Truncate => "TRUNCATE",
        }
    }
}

/// Trigger timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

/// Trigger metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDef {
    /// Schema name.
    pub schema: String,

    /// Trigger name.
    pub name: String,

    /// Owning table name.
    pub table: String,

    /// Firing timing.
    pub timing: TriggerTiming,

    /// Firing events.
    pub events: Vec<TriggerEvent>,

    /// Invoked function name.
    pub function: String,

    /// WHEN condition, without the keyword.
    pub when_clause: Option<String>,

    /// FOR EACH ROW (true) or FOR EACH STATEMENT (false).
    pub for_each_row: bool,
}

/// Sequence metadata. Used only during generation, never diffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDef {
    /// Schema name.
    pub schema: String,

    /// Sequence name.
    pub name: String,

    /// Value data type (smallint, integer, bigint).
    pub data_type: String,

    /// Start value.
    pub start: i64,

    /// Increment.
    pub increment: i64,

    /// Minimum value.
    pub min_value: i64,

    /// Maximum value.
    pub max_value: i64,

    /// Whether the sequence cycles.
    pub cycle: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_fk(table: &str, foreign_table: &str) -> ConstraintDef {
        ConstraintDef {
            table: table.to_string(),
            name: format!("{}_{}_fkey", table, foreign_table),
            kind: ConstraintKind::ForeignKey,
            columns: vec!["ref_id".to_string()],
            foreign_schema: Some("public".to_string()),
            foreign_table: Some(foreign_table.to_string()),
            foreign_columns: vec!["id".to_string()],
            update_rule: Some("NO ACTION".to_string()),
            delete_rule: Some("CASCADE".to_string()),
            deferrable: false,
            check_clause: None,
        }
    }

    #[test]
    fn test_full_name() {
        let table = TableDef {
            schema: "public".to_string(),
            name: "users".to_string(),
            columns: vec![],
            constraints: vec![],
            indexes: vec![],
            sequences: vec![],
            comment: None,
        };
        assert_eq!(table.full_name(), "public.users");
    }

    #[test]
    fn test_self_referencing_fk() {
        assert!(make_fk("employees", "employees").is_self_referencing());
        assert!(!make_fk("orders", "users").is_self_referencing());
    }

    #[test]
    fn test_routine_kind_from_return_type() {
        let mut f = FunctionDef {
            schema: "public".to_string(),
            name: "audit_stamp".to_string(),
            params: vec![],
            returns: "trigger".to_string(),
            language: "plpgsql".to_string(),
            body: "BEGIN RETURN NEW; END".to_string(),
            volatility: Volatility::Volatile,
            security_definer: false,
            comment: None,
        };
        assert_eq!(f.kind(), "function");
        assert!(!f.is_procedure());

        f.returns = "void".to_string();
        assert_eq!(f.kind(), "procedure");
        assert!(f.is_procedure());

        f.returns = "VOID".to_string();
        assert!(f.is_procedure());
    }

    #[test]
    fn test_constraint_kind_sql_spelling() {
        assert_eq!(ConstraintKind::PrimaryKey.as_sql(), "PRIMARY KEY");
        assert_eq!(ConstraintKind::ForeignKey.label(), "fkey");
        assert_eq!(ConstraintKind::Unique.label(), "key");
    }
}
