//! Identity keys and change signatures per object category.
//!
//! The identity key decides which objects are "the same object" across the
//! two snapshots; the signature decides whether a matched pair counts as
//! modified. Tables and indexes are create/drop only: internal table
//! change is handled by the column/constraint/index phases, and an index
//! whose definition changes gets a new name in practice.

use crate::core::identifier::normalize_default;
use crate::core::schema::{
    ColumnDef, ConstraintDef, ConstraintKind, FunctionDef, IndexDef, TableDef, TriggerDef,
    TriggerEvent, TriggerTiming,
};

/// Placeholder substituted for schema qualifiers in routine bodies.
const SCHEMA_PLACEHOLDER: &str = "<schema>.";

// =============================================================================
// Tables
// =============================================================================

pub fn table_key(table: &TableDef) -> String {
    table.name.clone()
}

// =============================================================================
// Columns
// =============================================================================

pub fn column_key(col: &ColumnDef) -> (String, String) {
    (col.table.clone(), col.name.clone())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSignature {
    pub rendered_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub identity: Option<crate::core::schema::IdentityMode>,
}

pub fn column_signature(col: &ColumnDef) -> ColumnSignature {
    ColumnSignature {
        rendered_type: crate::core::identifier::format_type(col),
        nullable: col.nullable,
        default: col.default.as_deref().map(normalize_default),
        identity: col.identity,
    }
}

// =============================================================================
// Constraints
// =============================================================================

pub fn constraint_key(c: &ConstraintDef) -> String {
    c.name.clone()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSignature {
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub foreign_table: Option<String>,
    pub foreign_columns: Vec<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

pub fn constraint_signature(c: &ConstraintDef) -> ConstraintSignature {
    ConstraintSignature {
        kind: c.kind,
        columns: c.columns.clone(),
        foreign_table: c.foreign_table.clone(),
        foreign_columns: c.foreign_columns.clone(),
        update_rule: c.update_rule.clone(),
        delete_rule: c.delete_rule.clone(),
    }
}

// =============================================================================
// Indexes
// =============================================================================

pub fn index_key(idx: &IndexDef) -> String {
    idx.name.clone()
}

// =============================================================================
// Functions / procedures
// =============================================================================

pub fn function_key(f: &FunctionDef) -> (String, &'static str) {
    (f.name.clone(), f.kind())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub kind: &'static str,
    pub returns: String,
    pub body: String,
}

/// Build a function signature with schema qualifiers neutralized.
///
/// Renaming the source or target schema alone must not register as a body
/// change, so occurrences of either compared schema name as a qualifier
/// are replaced with a placeholder before comparison.
pub fn function_signature(f: &FunctionDef, schemas: &[&str]) -> FunctionSignature {
    FunctionSignature {
        kind: f.kind(),
        returns: f.returns.to_lowercase(),
        body: normalize_body(&f.body, schemas),
    }
}

/// Replace schema-qualifier tokens and collapse whitespace.
pub fn normalize_body(body: &str, schemas: &[&str]) -> String {
    let mut result = body.to_string();
    for schema in schemas {
        if schema.is_empty() {
            continue;
        }
        result = result.replace(&format!("\"{}\".", schema), SCHEMA_PLACEHOLDER);
        result = result.replace(&format!("{}.", schema), SCHEMA_PLACEHOLDER);
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Triggers
// =============================================================================

pub fn trigger_key(t: &TriggerDef) -> String {
    t.name.clone()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSignature {
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub function: String,
    pub when_clause: Option<String>,
}

pub fn trigger_signature(t: &TriggerDef) -> TriggerSignature {
    TriggerSignature {
        timing: t.timing,
        events: t.events.clone(),
        function: t.function.clone(),
        when_clause: t.when_clause.clone(),
    }
}
