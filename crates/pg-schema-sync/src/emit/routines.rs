//! Routine phase: CREATE OR REPLACE for new and modified functions and
//! procedures, rename-to-backup for removed ones.

use crate::core::identifier::{qualify, quote_ident, wrap_function_body};
use crate::core::schema::{FunctionDef, ParamDef, ParamMode, Volatility};
use crate::diff::DiffSet;
use crate::emit::{backup_name, backup_review_comment};

/// Emit statements for the routine diff.
pub fn emit(diff: &DiffSet<FunctionDef>, target_schema: &str, timestamp: i64) -> Vec<String> {
    let mut statements = Vec::new();

    for f in &diff.to_create {
        statements.push(create_or_replace(f, target_schema));
    }

    // CREATE OR REPLACE overwrites in place; no rename dance needed.
    for pair in &diff.to_modify {
        statements.push(create_or_replace(&pair.source, target_schema));
    }

    for f in &diff.to_drop {
        statements.push(rename_away(f, target_schema, timestamp));
    }

    statements
}

/// Build CREATE OR REPLACE FUNCTION/PROCEDURE DDL.
pub fn create_or_replace(f: &FunctionDef, target_schema: &str) -> String {
    let keyword = if f.is_procedure() { "PROCEDURE" } else { "FUNCTION" };
    let params = render_params(&f.params);

    let mut sql = format!(
        "CREATE OR REPLACE {} {}({})",
        keyword,
        qualify(target_schema, &f.name),
        params
    );

    if !f.is_procedure() {
        sql.push_str(&format!("\nRETURNS {}", f.returns));
    }

    sql.push_str(&format!("\nLANGUAGE {}", f.language));

    if !f.is_procedure() && f.volatility != Volatility::Volatile {
        sql.push_str(&format!(" {}", f.volatility.as_sql()));
    }

    if f.security_definer {
        sql.push_str(" SECURITY DEFINER");
    }

    sql.push_str(&format!("\nAS {};", wrap_function_body(&f.body)));

    if let Some(ref comment) = f.comment {
        sql.push_str(&format!(
            "\nCOMMENT ON {} {}({}) IS {};",
            keyword,
            qualify(target_schema, &f.name),
            in_param_types(&f.params),
            crate::core::identifier::quote_literal(comment)
        ));
    }

    sql
}

/// Rename a routine to its backup name instead of dropping it.
fn rename_away(f: &FunctionDef, target_schema: &str, timestamp: i64) -> String {
    let keyword = if f.is_procedure() { "PROCEDURE" } else { "FUNCTION" };
    let backup = backup_name(&f.name, timestamp);

    format!(
        "{}\nALTER {} {}({}) RENAME TO {};",
        backup_review_comment(
            &keyword.to_lowercase(),
            &qualify(target_schema, &backup)
        ),
        keyword,
        qualify(target_schema, &f.name),
        in_param_types(&f.params),
        quote_ident(&backup)
    )
}

/// Render the full parameter list for a CREATE statement.
fn render_params(params: &[ParamDef]) -> String {
    params
        .iter()
        .map(|p| {
            let mut part = String::new();
            if p.mode != ParamMode::In {
                part.push_str(p.mode.as_sql());
                part.push(' ');
            }
            if !p.name.is_empty() {
                part.push_str(&quote_ident(&p.name));
                part.push(' ');
            }
            part.push_str(&p.data_type);
            if let Some(ref default) = p.default {
                part.push_str(&format!(" DEFAULT {}", default));
            }
            part
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render only the input parameter types, for ALTER/COMMENT signatures.
fn in_param_types(params: &[ParamDef]) -> String {
    params
        .iter()
        .filter(|p| matches!(p.mode, ParamMode::In | ParamMode::InOut | ParamMode::Variadic))
        .map(|p| p.data_type.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_objects;
    use crate::diff::signature::{function_key, function_signature};

    fn function(name: &str, returns: &str, body: &str) -> FunctionDef {
        FunctionDef {
            schema: "app".to_string(),
            name: name.to_string(),
            params: vec![],
            returns: returns.to_string(),
            language: "plpgsql".to_string(),
            body: body.to_string(),
            volatility: Volatility::Volatile,
            security_definer: false,
            comment: None,
        }
    }

    fn param(name: &str, data_type: &str, mode: ParamMode) -> ParamDef {
        ParamDef {
            name: name.to_string(),
            data_type: data_type.to_string(),
            mode,
            default: None,
        }
    }

    fn run(source: &[FunctionDef], target: &[FunctionDef]) -> Vec<String> {
        let diff = diff_objects(source, target, function_key, |f| {
            function_signature(f, &["app"])
        });
        emit(&diff, "app", 1700000000)
    }

    #[test]
    fn test_create_function() {
        let f = function("touch", "trigger", "BEGIN NEW.updated_at = now(); RETURN NEW; END");
        let stmts = run(&[f], &[]);
        assert_eq!(stmts.len(), 1);
        let sql = &stmts[0];
        assert!(sql.starts_with("CREATE OR REPLACE FUNCTION app.touch()"));
        assert!(sql.contains("RETURNS trigger"));
        assert!(sql.contains("LANGUAGE plpgsql"));
        assert!(sql.contains("$$"));
        assert!(sql.trim_end().ends_with("$$;"));
    }

    #[test]
    fn test_void_return_creates_procedure() {
        let p = function("archive_rows", "void", "BEGIN DELETE FROM old; END");
        let stmts = run(&[p], &[]);
        let sql = &stmts[0];
        assert!(sql.starts_with("CREATE OR REPLACE PROCEDURE app.archive_rows()"));
        assert!(!sql.contains("RETURNS"));
    }

    #[test]
    fn test_parameter_rendering() {
        let mut f = function("add_item", "bigint", "BEGIN RETURN 1; END");
        f.params = vec![
            param("item_name", "text", ParamMode::In),
            param("total", "bigint", ParamMode::Out),
            param("tags", "text[]", ParamMode::Variadic),
        ];
        let stmts = run(&[f], &[]);
        let sql = &stmts[0];
        assert!(sql.contains("(item_name text, OUT total bigint, VARIADIC tags text[])"));
    }

    #[test]
    fn test_stable_volatility_rendered() {
        let mut f = function("lookup", "integer", "SELECT 1");
        f.volatility = Volatility::Stable;
        let stmts = run(&[f], &[]);
        assert!(stmts[0].contains("LANGUAGE plpgsql STABLE"));
    }

    #[test]
    fn test_modified_body_recreated_in_place() {
        let desired = function("touch", "trigger", "BEGIN RETURN NEW; END");
        let current = function("touch", "trigger", "BEGIN RETURN OLD; END");
        let stmts = run(&[desired], &[current]);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("CREATE OR REPLACE FUNCTION"));
        assert!(stmts[0].contains("RETURN NEW"));
    }

    #[test]
    fn test_drop_becomes_rename_with_todo() {
        let mut stale = function("old_calc", "integer", "SELECT 2");
        stale.params = vec![param("x", "integer", ParamMode::In)];
        let stmts = run(&[], &[stale]);
        assert_eq!(stmts.len(), 1);
        let sql = &stmts[0];
        assert!(sql.contains("-- TODO:"));
        assert!(sql.contains("ALTER FUNCTION app.old_calc(integer) RENAME TO old_calc_backup_1700000000;"));
        assert!(!sql.contains("DROP FUNCTION"));
    }

    #[test]
    fn test_schema_qualifier_change_alone_is_not_a_diff() {
        let desired = function("touch", "trigger", "BEGIN UPDATE app.users SET x=1; END");
        let mut current = desired.clone();
        current.body = "BEGIN UPDATE legacy.users SET x=1; END".to_string();

        let diff = diff_objects(&[desired], &[current], function_key, |f| {
            function_signature(f, &["app", "legacy"])
        });
        assert!(diff.is_empty());
    }
}
