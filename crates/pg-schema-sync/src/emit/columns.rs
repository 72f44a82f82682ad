//! Column phase: additions, rename-to-backup removals, and coalesced
//! single-statement alterations.

use crate::core::identifier::{format_type, qualify, quote_ident};
use crate::core::schema::ColumnDef;
use crate::diff::signature::column_signature;
use crate::diff::{ChangedPair, DiffSet};
use crate::emit::{backup_name, backup_review_comment};
use crate::emit::tables::column_definition;

/// Emit statements for the column diff.
pub fn emit(diff: &DiffSet<ColumnDef>, target_schema: &str, timestamp: i64) -> Vec<String> {
    let mut statements = Vec::new();

    for col in &diff.to_create {
        statements.push(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            qualify(target_schema, &col.table),
            column_definition(col)
        ));
    }

    for pair in &diff.to_modify {
        statements.push(alter_column(pair, target_schema));
    }

    for col in &diff.to_drop {
        let backup = backup_name(&col.name, timestamp);
        statements.push(format!(
            "{}\nALTER TABLE {} RENAME COLUMN {} TO {};",
            backup_review_comment(
                "column",
                &format!("{}.{}", qualify(target_schema, &col.table), backup)
            ),
            qualify(target_schema, &col.table),
            quote_ident(&col.name),
            quote_ident(&backup)
        ));
    }

    statements
}

/// Build one coalesced ALTER TABLE statement for a modified column.
///
/// Type, nullability, and default changes are combined into a single
/// statement rather than one statement per change, minimizing round
/// trips when the script is applied.
fn alter_column(pair: &ChangedPair<ColumnDef>, target_schema: &str) -> String {
    let desired = column_signature(&pair.source);
    let current = column_signature(&pair.target);
    let col = quote_ident(&pair.source.name);

    let mut actions = Vec::new();

    if desired.rendered_type != current.rendered_type {
        actions.push(format!(
            "ALTER COLUMN {} TYPE {}",
            col,
            format_type(&pair.source)
        ));
    }

    if desired.nullable != current.nullable {
        if desired.nullable {
            actions.push(format!("ALTER COLUMN {} DROP NOT NULL", col));
        } else {
            actions.push(format!("ALTER COLUMN {} SET NOT NULL", col));
        }
    }

    if desired.default != current.default {
        match pair.source.default {
            Some(ref default) => {
                actions.push(format!("ALTER COLUMN {} SET DEFAULT {}", col, default))
            }
            None => actions.push(format!("ALTER COLUMN {} DROP DEFAULT", col)),
        }
    }

    if desired.identity != current.identity {
        // Identity transitions need their own clause family.
        match pair.source.identity {
            Some(mode) => actions.push(format!(
                "ALTER COLUMN {} ADD GENERATED {} AS IDENTITY",
                col,
                match mode {
                    crate::core::schema::IdentityMode::Always => "ALWAYS",
                    crate::core::schema::IdentityMode::ByDefault => "BY DEFAULT",
                }
            )),
            None => actions.push(format!("ALTER COLUMN {} DROP IDENTITY IF EXISTS", col)),
        }
    }

    format!(
        "ALTER TABLE {}\n    {};",
        qualify(target_schema, &pair.source.table),
        actions.join(",\n    ")
    )
}
