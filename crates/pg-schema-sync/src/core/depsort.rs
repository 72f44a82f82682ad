//! Topological ordering of tables by foreign-key dependencies.

use std::collections::HashMap;

use tracing::debug;

use crate::core::schema::TableDef;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Order tables so that referenced tables come before referencing ones.
///
/// Depth-first topological sort over non-self foreign-key edges. Cycles do
/// not fail the sort: a back-edge into a node currently on the stack is
/// skipped, so every table appears exactly once and cyclic edges resolve
/// in favor of whichever participant is reached first in input order.
/// Edges to tables outside the input set are ignored.
pub fn sort_by_dependency(tables: &[TableDef]) -> Vec<TableDef> {
    let index: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; tables.len()];
    let mut ordered = Vec::with_capacity(tables.len());

    // Stable tie-break: roots are visited in input order.
    for i in 0..tables.len() {
        visit(i, tables, &index, &mut marks, &mut ordered);
    }

    debug!(
        "Dependency order: {:?}",
        ordered.iter().map(|t: &TableDef| &t.name).collect::<Vec<_>>()
    );
    ordered
}

fn visit(
    i: usize,
    tables: &[TableDef],
    index: &HashMap<&str, usize>,
    marks: &mut Vec<Mark>,
    ordered: &mut Vec<TableDef>,
) {
    match marks[i] {
        Mark::Done => return,
        Mark::Visiting => return, // cycle: stop descending
        Mark::Unvisited => {}
    }
    marks[i] = Mark::Visiting;

    for fk in tables[i].foreign_keys() {
        if fk.is_self_referencing() {
            continue;
        }
        let Some(target) = fk.foreign_table.as_deref() else {
            continue;
        };
        if let Some(&j) = index.get(target) {
            visit(j, tables, index, marks, ordered);
        }
    }

    marks[i] = Mark::Done;
    ordered.push(tables[i].clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ConstraintDef, ConstraintKind, TableDef};

    fn table(name: &str, fk_targets: &[&str]) -> TableDef {
        let constraints = fk_targets
            .iter()
            .map(|target| ConstraintDef {
                table: name.to_string(),
                name: format!("{}_{}_fkey", name, target),
                kind: ConstraintKind::ForeignKey,
                columns: vec![format!("{}_id", target)],
                foreign_schema: Some("public".to_string()),
                foreign_table: Some(target.to_string()),
                foreign_columns: vec!["id".to_string()],
                update_rule: None,
                delete_rule: None,
                deferrable: false,
                check_clause: None,
            })
            .collect();

        TableDef {
            schema: "public".to_string(),
            name: name.to_string(),
            columns: vec![],
            constraints,
            indexes: vec![],
            sequences: vec![],
            comment: None,
        }
    }

    fn names(tables: &[TableDef]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_chain_ordered_leaf_first() {
        let input = vec![table("c", &["b"]), table("b", &["a"]), table("a", &[])];
        assert_eq!(names(&sort_by_dependency(&input)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_independent_tables_keep_input_order() {
        let input = vec![table("x", &[]), table("y", &[]), table("z", &[])];
        assert_eq!(names(&sort_by_dependency(&input)), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_cycle_terminates_with_all_tables() {
        let input = vec![table("a", &["b"]), table("b", &["a"])];
        let sorted = sort_by_dependency(&input);
        assert_eq!(sorted.len(), 2);
        let mut got = names(&sorted);
        got.sort();
        assert_eq!(got, vec!["a", "b"]);
    }

    #[test]
    fn test_cycle_tie_break_is_input_order() {
        // "a" is visited first; its edge to "b" completes "b" before "a".
        let input = vec![table("a", &["b"]), table("b", &["a"])];
        assert_eq!(names(&sort_by_dependency(&input)), vec!["b", "a"]);

        let flipped = vec![table("b", &["a"]), table("a", &["b"])];
        assert_eq!(names(&sort_by_dependency(&flipped)), vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_excluded_from_edges() {
        let input = vec![table("employees", &["employees"])];
        let sorted = sort_by_dependency(&input);
        assert_eq!(names(&sorted), vec!["employees"]);
    }

    #[test]
    fn test_edge_to_unknown_table_ignored() {
        let input = vec![table("orders", &["archived_users"])];
        assert_eq!(names(&sort_by_dependency(&input)), vec!["orders"]);
    }

    #[test]
    fn test_diamond_dependency() {
        // d -> b -> a, d -> c -> a
        let input = vec![
            table("d", &["b", "c"]),
            table("c", &["a"]),
            table("b", &["a"]),
            table("a", &[]),
        ];
        let binding = sort_by_dependency(&input);
        let sorted = names(&binding);
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);
    }
}
