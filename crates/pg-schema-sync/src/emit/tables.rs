//! Table phase: CREATE TABLE for new tables, rename-to-backup for removed.

use crate::core::depsort::sort_by_dependency;
use crate::core::identifier::{format_type, qualify, quote_ident};
use crate::core::schema::{ColumnDef, IdentityMode, TableDef};
use crate::diff::DiffSet;
use crate::emit::{backup_name, backup_review_comment, todo_comment};

/// Emit statements for the table diff.
///
/// Creates come first, in dependency order, as bare CREATE TABLE DDL;
/// constraints (including primary keys) are added by the constraints
/// phase so that each constraint is emitted exactly once. Drops are
/// renames to a timestamped backup name plus a review marker.
pub fn emit(diff: &DiffSet<TableDef>, target_schema: &str, timestamp: i64) -> Vec<String> {
    let mut statements = Vec::new();

    for table in sort_by_dependency(&diff.to_create) {
        if table.columns.is_empty() {
            statements.push(empty_table_marker(&table));
        } else {
            statements.push(create_table(&table, target_schema));
        }
    }

    for table in &diff.to_drop {
        let backup = backup_name(&table.name, timestamp);
        statements.push(format!(
            "{}\nALTER TABLE {} RENAME TO {};",
            backup_review_comment("table", &qualify(target_schema, &backup)),
            qualify(target_schema, &table.name),
            quote_ident(&backup)
        ));
    }

    statements
}

/// Build CREATE TABLE DDL with the full ordered column list.
pub fn create_table(table: &TableDef, target_schema: &str) -> String {
    let mut lines = Vec::with_capacity(table.columns.len());
    for col in &table.columns {
        lines.push(format!("    {}", column_definition(col)));
    }

    let mut ddl = format!(
        "CREATE TABLE {} (\n{}\n);",
        qualify(target_schema, &table.name),
        lines.join(",\n")
    );

    if let Some(ref comment) = table.comment {
        ddl.push_str(&format!(
            "\nCOMMENT ON TABLE {} IS {};",
            qualify(target_schema, &table.name),
            crate::core::identifier::quote_literal(comment)
        ));
    }

    ddl
}

/// Render one column definition for CREATE TABLE or ADD COLUMN.
pub fn column_definition(col: &ColumnDef) -> String {
    let mut def = format!("{} {}", quote_ident(&col.name), format_type(col));

    if let Some(ref expr) = col.generated {
        def.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", expr));
        return def;
    }

    match col.identity {
        Some(IdentityMode::Always) => def.push_str(" GENERATED ALWAYS AS IDENTITY"),
        Some(IdentityMode::ByDefault) => def.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
        None => {
            if let Some(ref default) = col.default {
                def.push_str(&format!(" DEFAULT {}", default));
            }
        }
    }

    if !col.nullable {
        def.push_str(" NOT NULL");
    }

    def
}

/// Degraded placeholder for a table descriptor with no columns.
pub fn empty_table_marker(table: &TableDef) -> String {
    todo_comment(&format!(
        "table {} has no column metadata; define it manually",
        table.full_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ConstraintDef, ConstraintKind};
    use crate::diff::{diff_objects, signature::table_key};

    fn column(table: &str, name: &str, data_type: &str, nullable: bool) -> ColumnDef {
        ColumnDef {
            table: table.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length: 0,
            precision: 0,
            scale: 0,
            nullable,
            default: None,
            identity: None,
            generated: None,
            ordinal: 0,
        }
    }

    fn table(name: &str, columns: Vec<ColumnDef>) -> TableDef {
        TableDef {
            schema: "public".to_string(),
            name: name.to_string(),
            columns,
            constraints: vec![],
            indexes: vec![],
            sequences: vec![],
            comment: None,
        }
    }

    fn fk(table: &str, target: &str) -> ConstraintDef {
        ConstraintDef {
            table: table.to_string(),
            name: format!("{}_{}_fkey", table, target),
            kind: ConstraintKind::ForeignKey,
            columns: vec![format!("{}_id", target)],
            foreign_schema: None,
            foreign_table: Some(target.to_string()),
            foreign_columns: vec!["id".to_string()],
            update_rule: None,
            delete_rule: None,
            deferrable: false,
            check_clause: None,
        }
    }

    #[test]
    fn test_create_table_lists_columns_in_order() {
        let t = table(
            "users",
            vec![
                column("users", "id", "int8", false),
                column("users", "email", "varchar", true),
            ],
        );
        let diff = diff_objects(&[t], &[], table_key, |_| ());
        let stmts = emit(&diff, "app", 1700000000);

        assert_eq!(stmts.len(), 1);
        let ddl = &stmts[0];
        assert!(ddl.starts_with("CREATE TABLE app.users (\n"));
        let id_pos = ddl.find("id bigint NOT NULL").unwrap();
        let email_pos = ddl.find("email character varying").unwrap();
        assert!(id_pos < email_pos);
        assert!(ddl.trim_end().ends_with(");"));
    }

    #[test]
    fn test_creates_follow_dependency_order() {
        let mut orders = table("orders", vec![column("orders", "id", "int4", false)]);
        orders.constraints.push(fk("orders", "users"));
        let users = table("users", vec![column("users", "id", "int4", false)]);

        let diff = diff_objects(&[orders, users], &[], table_key, |_| ());
        let stmts = emit(&diff, "app", 0);
        let script = stmts.join("\n");
        assert!(script.find("CREATE TABLE app.users").unwrap() < script.find("CREATE TABLE app.orders").unwrap());
    }

    #[test]
    fn test_drop_becomes_rename_with_todo() {
        let stale = table("legacy", vec![column("legacy", "id", "int4", false)]);
        let diff = diff_objects(&[], &[stale], table_key, |_| ());
        let stmts = emit(&diff, "app", 1700000000);

        assert_eq!(stmts.len(), 1);
        let stmt = &stmts[0];
        assert!(stmt.contains("-- TODO:"));
        assert!(stmt.contains("ALTER TABLE app.legacy RENAME TO legacy_backup_1700000000;"));
        assert!(!stmt.contains("DROP TABLE"));
    }

    #[test]
    fn test_identity_column_rendering() {
        let mut id = column("t", "id", "int8", false);
        id.identity = Some(IdentityMode::Always);
        assert_eq!(
            column_definition(&id),
            "id bigint GENERATED ALWAYS AS IDENTITY NOT NULL"
        );

        id.identity = Some(IdentityMode::ByDefault);
        assert_eq!(
            column_definition(&id),
            "id bigint GENERATED BY DEFAULT AS IDENTITY NOT NULL"
        );
    }

    #[test]
    fn test_default_and_generated_rendering() {
        let mut c = column("t", "created_at", "timestamptz", false);
        c.default = Some("now()".to_string());
        assert_eq!(
            column_definition(&c),
            "created_at timestamp with time zone DEFAULT now() NOT NULL"
        );

        let mut g = column("t", "total", "numeric", true);
        g.generated = Some("price * qty".to_string());
        assert_eq!(
            column_definition(&g),
            "total numeric GENERATED ALWAYS AS (price * qty) STORED"
        );
    }
}
