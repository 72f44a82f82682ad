//! Constraint name synthesis following PostgreSQL's own conventions.
//!
//! Target databases frequently contain convention-named constraints
//! (`users_pkey`, `orders_user_id_fkey`). Synthesized names must match
//! those, not duplicate them under a different spelling.

use chrono::Utc;

use crate::core::identifier::MAX_IDENTIFIER_LENGTH;
use crate::core::schema::ConstraintKind;

/// Whether an existing constraint name can be kept as-is.
///
/// Valid means non-empty, within the identifier length limit, and starting
/// with a letter or underscore.
pub fn is_valid_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LENGTH && (first.is_ascii_alphabetic() || first == '_')
}

/// Derive a constraint name, preserving a valid original.
///
/// Convention names mirror PostgreSQL's defaults: `{table}_pkey`,
/// `{table}_{cols}_key`, `{table}_{cols}_fkey`. CHECK constraints get a
/// timestamp suffix because they lack a natural unique key and repeated
/// runs must not collide.
pub fn synthesize_name(
    original: &str,
    kind: ConstraintKind,
    table: &str,
    columns: &[String],
) -> String {
    if is_valid_name(original) {
        return original.to_string();
    }

    let cols = columns
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join("_");

    let name = match kind {
        ConstraintKind::PrimaryKey => format!("{}_pkey", table),
        ConstraintKind::Unique => format!("{}_{}_key", table, cols),
        ConstraintKind::ForeignKey => format!("{}_{}_fkey", table, cols),
        ConstraintKind::Check => {
            format!("{}_{}_check_{}", table, cols, Utc::now().timestamp())
        }
        other => format!("{}_{}_{}", table, cols, other.label()),
    };

    truncate_identifier(name)
}

/// Fit a synthesized name into the identifier length limit, preserving the
/// convention suffix by squeezing the middle.
fn truncate_identifier(name: String) -> String {
    if name.len() <= MAX_IDENTIFIER_LENGTH {
        return name;
    }

    // Keep the trailing convention part (after the last '_' group) intact.
    let mut keep_tail = name
        .rfind('_')
        .map(|i| name.len() - i)
        .unwrap_or(0)
        .min(MAX_IDENTIFIER_LENGTH / 2);
    while !name.is_char_boundary(name.len() - keep_tail) {
        keep_tail -= 1;
    }
    let mut head_len = MAX_IDENTIFIER_LENGTH - keep_tail;
    while !name.is_char_boundary(head_len) {
        head_len -= 1;
    }

    let mut out = String::with_capacity(MAX_IDENTIFIER_LENGTH);
    out.push_str(&name[..head_len]);
    out.push_str(&name[name.len() - keep_tail..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_original_preserved() {
        assert_eq!(
            synthesize_name("my_custom_pk", ConstraintKind::PrimaryKey, "orders", &cols(&["id"])),
            "my_custom_pk"
        );
        assert_eq!(
            synthesize_name("_leading_underscore", ConstraintKind::Unique, "t", &cols(&["a"])),
            "_leading_underscore"
        );
    }

    #[test]
    fn test_empty_original_synthesizes_pkey() {
        assert_eq!(
            synthesize_name("", ConstraintKind::PrimaryKey, "orders", &cols(&["id"])),
            "orders_pkey"
        );
    }

    #[test]
    fn test_digit_leading_original_replaced() {
        let name = synthesize_name("1bad", ConstraintKind::Check, "orders", &cols(&["total"]));
        assert!(
            name.starts_with("orders_total_check_"),
            "unexpected name: {name}"
        );
        let ts = &name["orders_total_check_".len()..];
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_unique_and_fkey_conventions() {
        assert_eq!(
            synthesize_name("", ConstraintKind::Unique, "users", &cols(&["Email"])),
            "users_email_key"
        );
        assert_eq!(
            synthesize_name("", ConstraintKind::ForeignKey, "orders", &cols(&["user_id"])),
            "orders_user_id_fkey"
        );
    }

    #[test]
    fn test_multi_column_join() {
        assert_eq!(
            synthesize_name("", ConstraintKind::Unique, "t", &cols(&["a", "b", "c"])),
            "t_a_b_c_key"
        );
    }

    #[test]
    fn test_overlong_original_replaced() {
        let long = "x".repeat(64);
        let name = synthesize_name(&long, ConstraintKind::PrimaryKey, "orders", &cols(&["id"]));
        assert_eq!(name, "orders_pkey");
    }

    #[test]
    fn test_synthesized_name_respects_length_limit() {
        let wide_table = "a".repeat(70);
        let name = synthesize_name("", ConstraintKind::Unique, &wide_table, &cols(&["col"]));
        assert!(name.len() <= MAX_IDENTIFIER_LENGTH);
        assert!(name.ends_with("_key"));
    }
}
