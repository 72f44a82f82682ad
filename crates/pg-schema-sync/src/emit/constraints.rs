//! Constraint phase: ADD CONSTRAINT for new ones, rename-to-backup for
//! removed ones, rename-then-recreate for modified ones.

use crate::core::identifier::{qualify, quote_ident};
use crate::core::naming::synthesize_name;
use crate::core::schema::{ConstraintDef, ConstraintKind};
use crate::diff::DiffSet;
use crate::emit::{backup_name, backup_review_comment, column_list, todo_comment};

/// Emit statements for the constraint diff.
///
/// Creates are ordered by kind: key constraints first (PRIMARY KEY,
/// UNIQUE), then CHECK and NOT NULL, then foreign keys, with
/// self-referencing foreign keys last. A foreign key can only be added
/// once the referenced key constraint exists, so kind order matters
/// within the phase.
pub fn emit(diff: &DiffSet<ConstraintDef>, target_schema: &str, timestamp: i64) -> Vec<String> {
    let mut statements = Vec::new();

    let mut creates: Vec<&ConstraintDef> = diff.to_create.iter().collect();
    creates.sort_by_key(|c| kind_rank(c));

    for constraint in creates {
        statements.push(add_constraint(constraint, target_schema));
    }

    for pair in &diff.to_modify {
        statements.push(format!(
            "{}\n{}",
            rename_away(&pair.target, target_schema, timestamp),
            add_constraint(&pair.source, target_schema)
        ));
    }

    for constraint in &diff.to_drop {
        statements.push(rename_away(constraint, target_schema, timestamp));
    }

    statements
}

fn kind_rank(c: &ConstraintDef) -> u8 {
    match c.kind {
        ConstraintKind::PrimaryKey => 0,
        ConstraintKind::Unique => 1,
        ConstraintKind::Check => 2,
        ConstraintKind::NotNull => 3,
        ConstraintKind::ForeignKey => {
            if c.is_self_referencing() {
                5
            } else {
                4
            }
        }
    }
}

/// Build the ADD CONSTRAINT (or SET NOT NULL) statement for one constraint.
pub fn add_constraint(c: &ConstraintDef, target_schema: &str) -> String {
    let table = qualify(target_schema, &c.table);

    // NOT NULL is column-local; PostgreSQL has no named ADD CONSTRAINT form.
    if c.kind == ConstraintKind::NotNull {
        let Some(col) = c.columns.first() else {
            return todo_comment(&format!(
                "NOT NULL constraint on {} names no column; add it manually",
                table
            ));
        };
        return format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL;",
            table,
            quote_ident(col)
        );
    }

    let name = synthesize_name(&c.name, c.kind, &c.table, &c.columns);

    let definition = match c.kind {
        ConstraintKind::PrimaryKey => format!("PRIMARY KEY ({})", column_list(&c.columns)),
        ConstraintKind::Unique => format!("UNIQUE ({})", column_list(&c.columns)),
        ConstraintKind::Check => match c.check_clause {
            Some(ref clause) => format!("CHECK ({})", clause.trim()),
            None => {
                return todo_comment(&format!(
                    "CHECK constraint {} on {} has no recorded expression; add it manually",
                    name, table
                ));
            }
        },
        ConstraintKind::ForeignKey => match foreign_key_clause(c, target_schema) {
            Some(clause) => clause,
            None => {
                return todo_comment(&format!(
                    "FOREIGN KEY constraint {} on {} references an unknown table; add it manually",
                    name, table
                ));
            }
        },
        ConstraintKind::NotNull => unreachable!(),
    };

    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {};",
        table,
        quote_ident(&name),
        definition
    )
}

/// REFERENCES clause for a foreign key, or None when the descriptor is
/// missing its referenced table.
fn foreign_key_clause(c: &ConstraintDef, target_schema: &str) -> Option<String> {
    let foreign_table = c.foreign_table.as_deref()?;

    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        column_list(&c.columns),
        qualify(target_schema, foreign_table),
        column_list(&c.foreign_columns)
    );

    if let Some(ref rule) = c.update_rule {
        if rule != "NO ACTION" {
            clause.push_str(&format!(" ON UPDATE {}", rule));
        }
    }
    if let Some(ref rule) = c.delete_rule {
        if rule != "NO ACTION" {
            clause.push_str(&format!(" ON DELETE {}", rule));
        }
    }
    if c.deferrable {
        clause.push_str(" DEFERRABLE INITIALLY DEFERRED");
    }

    Some(clause)
}

/// Rename a constraint to its backup name instead of dropping it.
fn rename_away(c: &ConstraintDef, target_schema: &str, timestamp: i64) -> String {
    let table = qualify(target_schema, &c.table);

    // NOT NULL has no name to rename; dropping nullability loses no data.
    if c.kind == ConstraintKind::NotNull {
        let Some(col) = c.columns.first() else {
            return todo_comment(&format!(
                "NOT NULL constraint on {} names no column; review manually",
                table
            ));
        };
        return format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL;",
            table,
            quote_ident(col)
        );
    }

    let backup = backup_name(&c.name, timestamp);
    format!(
        "{}\nALTER TABLE {} RENAME CONSTRAINT {} TO {};",
        backup_review_comment("constraint", &format!("{}.{}", table, backup)),
        table,
        quote_ident(&c.name),
        quote_ident(&backup)
    )
}
