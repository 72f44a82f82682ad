//! Object diff engine.
//!
//! One generic comparator drives all six phases. Each category supplies an
//! identity key (how an object is matched across snapshots) and a change
//! signature (which fields make a matched pair count as modified); see
//! [`signature`].

pub mod signature;

use std::collections::HashMap;
use std::hash::Hash;

/// A matched pair whose change signatures differ.
#[derive(Debug, Clone)]
pub struct ChangedPair<T> {
    /// The desired shape (from the source snapshot).
    pub source: T,
    /// The current shape (from the target snapshot).
    pub target: T,
}

/// Result of diffing one object category.
#[derive(Debug, Clone)]
pub struct DiffSet<T> {
    /// Source items whose identity key is absent from the target.
    pub to_create: Vec<T>,
    /// Target items whose identity key is absent from the source.
    pub to_drop: Vec<T>,
    /// Items present in both snapshots with differing signatures.
    pub to_modify: Vec<ChangedPair<T>>,
}

impl<T> DiffSet<T> {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_drop.is_empty() && self.to_modify.is_empty()
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.to_create.len(),
            self.to_drop.len(),
            self.to_modify.len(),
        )
    }
}

/// Compute create/drop/modify sets for one object category.
///
/// Output order is deterministic: `to_create` and `to_modify` follow
/// source order, `to_drop` follows target order. Every identity key lands
/// in at most one of the three sets.
pub fn diff_objects<T, K, S>(
    source: &[T],
    target: &[T],
    key: impl Fn(&T) -> K,
    sig: impl Fn(&T) -> S,
) -> DiffSet<T>
where
    T: Clone,
    K: Eq + Hash,
    S: PartialEq,
{
    let target_by_key: HashMap<K, &T> = target.iter().map(|t| (key(t), t)).collect();
    let source_keys: Vec<K> = source.iter().map(&key).collect();

    let mut to_create = Vec::new();
    let mut to_modify = Vec::new();

    for item in source {
        match target_by_key.get(&key(item)) {
            None => to_create.push(item.clone()),
            Some(existing) => {
                if sig(item) != sig(existing) {
                    to_modify.push(ChangedPair {
                        source: item.clone(),
                        target: (*existing).clone(),
                    });
                }
            }
        }
    }

    let source_key_set: std::collections::HashSet<&K> = source_keys.iter().collect();
    let to_drop = target
        .iter()
        .filter(|t| !source_key_set.contains(&key(t)))
        .cloned()
        .collect();

    DiffSet {
        to_create,
        to_drop,
        to_modify,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Obj {
        name: &'static str,
        value: i32,
    }

    fn obj(name: &'static str, value: i32) -> Obj {
        Obj { name, value }
    }

    fn run(source: &[Obj], target: &[Obj]) -> DiffSet<Obj> {
        diff_objects(source, target, |o| o.name, |o| o.value)
    }

    #[test]
    fn test_identical_snapshots_yield_empty_sets() {
        let a = vec![obj("x", 1), obj("y", 2)];
        let diff = run(&a, &a);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_source_only_items_created() {
        let diff = run(&[obj("x", 1), obj("y", 2)], &[obj("x", 1)]);
        assert_eq!(diff.to_create.len(), 1);
        assert_eq!(diff.to_create[0].name, "y");
        assert!(diff.to_drop.is_empty());
        assert!(diff.to_modify.is_empty());
    }

    #[test]
    fn test_target_only_items_dropped() {
        let diff = run(&[obj("x", 1)], &[obj("x", 1), obj("stale", 9)]);
        assert_eq!(diff.to_drop.len(), 1);
        assert_eq!(diff.to_drop[0].name, "stale");
    }

    #[test]
    fn test_signature_change_modifies() {
        let diff = run(&[obj("x", 2)], &[obj("x", 1)]);
        assert_eq!(diff.to_modify.len(), 1);
        assert_eq!(diff.to_modify[0].source.value, 2);
        assert_eq!(diff.to_modify[0].target.value, 1);
        assert!(diff.to_create.is_empty());
        assert!(diff.to_drop.is_empty());
    }

    #[test]
    fn test_completeness_partition() {
        // Every key present in exactly one snapshot appears in exactly one
        // of create/drop; keys in both with equal signatures appear nowhere.
        let source = vec![obj("only_src", 1), obj("both_same", 2), obj("both_diff", 3)];
        let target = vec![obj("both_same", 2), obj("both_diff", 4), obj("only_tgt", 5)];
        let diff = run(&source, &target);

        assert_eq!(diff.to_create.len(), 1);
        assert_eq!(diff.to_create[0].name, "only_src");
        assert_eq!(diff.to_drop.len(), 1);
        assert_eq!(diff.to_drop[0].name, "only_tgt");
        assert_eq!(diff.to_modify.len(), 1);
        assert_eq!(diff.to_modify[0].source.name, "both_diff");
    }

    #[test]
    fn test_output_order_is_deterministic() {
        let source = vec![obj("b", 1), obj("a", 1), obj("c", 1)];
        let target: Vec<Obj> = vec![];
        let diff = run(&source, &target);
        let created: Vec<_> = diff.to_create.iter().map(|o| o.name).collect();
        assert_eq!(created, vec!["b", "a", "c"]);
    }
}
