//! Trigger phase: create, direct drop, and drop-then-recreate for
//! modifications. Triggers carry no data, so drops are real drops.

use crate::core::identifier::{qualify, quote_ident};
use crate::core::schema::TriggerDef;
use crate::diff::DiffSet;

/// Emit statements for the trigger diff.
pub fn emit(diff: &DiffSet<TriggerDef>, target_schema: &str) -> Vec<String> {
    let mut statements = Vec::new();

    for trigger in &diff.to_create {
        statements.push(create_trigger(trigger, target_schema));
    }

    for pair in &diff.to_modify {
        statements.push(format!(
            "{}\n{}",
            drop_trigger(&pair.target, target_schema),
            create_trigger(&pair.source, target_schema)
        ));
    }

    for trigger in &diff.to_drop {
        statements.push(drop_trigger(trigger, target_schema));
    }

    statements
}

/// Build CREATE TRIGGER DDL.
pub fn create_trigger(t: &TriggerDef, target_schema: &str) -> String {
    let events = t
        .events
        .iter()
        .map(|e| e.as_sql())
        .collect::<Vec<_>>()
        .join(" OR ");

    let orientation = if t.for_each_row { "ROW" } else { "STATEMENT" };

    let mut sql = format!(
        "CREATE TRIGGER {}\n    {} {} ON {}\n    FOR EACH {}",
        quote_ident(&t.name),
        t.timing.as_sql(),
        events,
        qualify(target_schema, &t.table),
        orientation
    );

    if let Some(ref when) = t.when_clause {
        sql.push_str(&format!("\n    WHEN ({})", when));
    }

    sql.push_str(&format!(
        "\n    EXECUTE FUNCTION {}();",
        function_reference(&t.function, target_schema)
    ));
    sql
}

fn drop_trigger(t: &TriggerDef, target_schema: &str) -> String {
    format!(
        "DROP TRIGGER {} ON {};",
        quote_ident(&t.name),
        qualify(target_schema, &t.table)
    )
}

/// Qualify the invoked function with the target schema unless the
/// descriptor already carries a qualifier.
fn function_reference(function: &str, target_schema: &str) -> String {
    if function.contains('.') {
        function.to_string()
    } else {
        qualify(target_schema, function)
    }
}
