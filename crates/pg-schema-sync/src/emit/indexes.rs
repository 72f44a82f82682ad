//! Index phase: plain create/drop. Indexes carry no data, so removals are
//! real DROP statements rather than renames.

use crate::core::identifier::{qualify, quote_ident};
use crate::core::schema::IndexDef;
use crate::diff::DiffSet;

/// Emit statements for the index diff.
///
/// Indexes backing a PRIMARY KEY or UNIQUE constraint are skipped in both
/// directions; their lifecycle belongs to the constraint DDL and emitting
/// them here would duplicate it.
pub fn emit(diff: &DiffSet<IndexDef>, target_schema: &str) -> Vec<String> {
    let mut statements = Vec::new();

    for idx in diff.to_create.iter().filter(|i| !i.backs_constraint) {
        statements.push(create_index(idx, target_schema));
    }

    for idx in diff.to_drop.iter().filter(|i| !i.backs_constraint) {
        statements.push(format!(
            "DROP INDEX {};",
            qualify(target_schema, &idx.name)
        ));
    }

    statements
}

/// Build CREATE INDEX DDL.
pub fn create_index(idx: &IndexDef, target_schema: &str) -> String {
    let unique = if idx.is_unique { "UNIQUE " } else { "" };

    let cols = idx
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let using = if idx.method.is_empty() || idx.method == "btree" {
        String::new()
    } else {
        format!(" USING {}", idx.method)
    };

    let mut sql = format!(
        "CREATE {}INDEX {} ON {}{} ({})",
        unique,
        quote_ident(&idx.name),
        qualify(target_schema, &idx.table),
        using,
        cols
    );

    if let Some(ref predicate) = idx.predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    sql.push(';');
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_objects;
    use crate::diff::signature::index_key;

    fn index(name: &str, table: &str, columns: &[&str]) -> IndexDef {
        IndexDef {
            table: table.to_string(),
            name: name.to_string(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            is_unique: false,
            predicate: None,
            method: "btree".to_string(),
            backs_constraint: false,
        }
    }

    fn run(source: &[IndexDef], target: &[IndexDef]) -> Vec<String> {
        let diff = diff_objects(source, target, index_key, |_| ());
        emit(&diff, "app")
    }

    #[test]
    fn test_create_btree_elides_using() {
        let stmts = run(&[index("users_email_idx", "users", &["email"])], &[]);
        assert_eq!(
            stmts,
            vec!["CREATE INDEX users_email_idx ON app.users (email);"]
        );
    }

    #[test]
    fn test_create_unique_with_method_and_predicate() {
        let mut idx = index("active_users_idx", "users", &["email"]);
        idx.is_unique = true;
        idx.method = "hash".to_string();
        idx.predicate = Some("deleted_at IS NULL".to_string());

        let stmts = run(&[idx], &[]);
        assert_eq!(
            stmts,
            vec!["CREATE UNIQUE INDEX active_users_idx ON app.users USING hash (email) WHERE deleted_at IS NULL;"]
        );
    }

    #[test]
    fn test_drop_is_direct() {
        let stmts = run(&[], &[index("stale_idx", "users", &["x"])]);
        assert_eq!(stmts, vec!["DROP INDEX app.stale_idx;"]);
    }

    #[test]
    fn test_constraint_backed_index_skipped() {
        let mut pk_idx = index("users_pkey", "users", &["id"]);
        pk_idx.backs_constraint = true;
        pk_idx.is_unique = true;

        assert!(run(&[pk_idx.clone()], &[]).is_empty());
        assert!(run(&[], &[pk_idx]).is_empty());
    }
}
