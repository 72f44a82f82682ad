//! Identifier quoting, literal escaping, and type formatting.
//!
//! All emitted DDL goes through this module. Functions are pure: no
//! configuration, no state. Quoting is minimal: identifiers that are
//! already valid bare names are left bare so generated scripts read like
//! hand-written SQL.

use crate::core::schema::ColumnDef;

/// Maximum identifier length in PostgreSQL (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Whether a name is a valid bare (unquoted) identifier.
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier for PostgreSQL.
///
/// Returns the bare name when it is already a valid identifier; otherwise
/// wraps it in double quotes with internal quotes doubled.
pub fn quote_ident(name: &str) -> String {
    if is_bare_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Qualify a name with its schema, quoting both parts.
pub fn qualify(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quote a string literal, doubling internal single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Map a catalog udt name to its SQL display type.
fn display_type(data_type: &str) -> String {
    match data_type.to_ascii_lowercase().as_str() {
        "int2" => "smallint".to_string(),
        "int4" => "integer".to_string(),
        "int8" => "bigint".to_string(),
        "float4" => "real".to_string(),
        "float8" => "double precision".to_string(),
        "bool" => "boolean".to_string(),
        "varchar" => "character varying".to_string(),
        "bpchar" | "char" => "character".to_string(),
        "timestamp" => "timestamp without time zone".to_string(),
        "timestamptz" => "timestamp with time zone".to_string(),
        "time" => "time without time zone".to_string(),
        "timetz" => "time with time zone".to_string(),
        "decimal" => "numeric".to_string(),
        lower => lower.to_string(),
    }
}

/// Per-type default length elided from emitted DDL.
///
/// Re-stating a default produces noisy diffs between a snapshot that
/// records the default explicitly and one that does not.
fn default_length(display: &str) -> Option<i32> {
    match display {
        "character varying" => Some(255),
        "character" => Some(1),
        "bit" | "bit varying" => Some(1),
        _ => None,
    }
}

/// Default fractional-second precision for time types.
const DEFAULT_TIME_PRECISION: i32 = 6;

fn is_time_type(display: &str) -> bool {
    matches!(
        display,
        "timestamp without time zone"
            | "timestamp with time zone"
            | "time without time zone"
            | "time with time zone"
    )
}

/// Render a column's type, appending length/precision only when it
/// differs from the per-type default.
pub fn format_type(col: &ColumnDef) -> String {
    let display = display_type(&col.data_type);

    if let Some(default_len) = default_length(&display) {
        // -1 means unbounded (no length clause), 0 means unset.
        if col.max_length > 0 && col.max_length != default_len {
            return format!("{}({})", display, col.max_length);
        }
        return display;
    }

    if display == "numeric" {
        // NUMERIC has no default precision; emit whatever was declared.
        if col.precision > 0 {
            if col.scale > 0 {
                return format!("{}({},{})", display, col.precision, col.scale);
            }
            return format!("{}({})", display, col.precision);
        }
        return display;
    }

    if is_time_type(&display) && col.precision > 0 && col.precision != DEFAULT_TIME_PRECISION {
        return format!("{}({})", display, col.precision);
    }

    display
}

/// Normalize a catalog default expression for stable comparison.
///
/// Strips trailing `::type` casts and collapses whitespace so that
/// `'x'::character varying` and `'x'` compare equal.
pub fn normalize_default(default: &str) -> String {
    let mut result = default.trim().to_string();

    // Peel repeated trailing casts: expr::type, expr::type(10), expr::"my type"
    loop {
        let Some(pos) = result.rfind("::") else { break };
        let suffix = &result[pos + 2..];
        let is_cast = !suffix.is_empty()
            && suffix.chars().all(|c| {
                c.is_ascii_alphanumeric()
                    || c == '_'
                    || c == ' '
                    || c == '"'
                    || c == '('
                    || c == ')'
                    || c == ','
            });
        if is_cast {
            result.truncate(pos);
            result = result.trim_end().to_string();
        } else {
            break;
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a default expression is a serial-style sequence default.
pub fn is_sequence_default(default: &str) -> bool {
    default.trim_start().starts_with("nextval(")
}

/// Wrap a routine body in dollar quotes exactly once.
///
/// Trailing whitespace and semicolons are trimmed first. A body that is
/// already dollar-quoted is returned unchanged. The quote tag is chosen
/// to avoid collision with any dollar quoting inside the body.
pub fn wrap_function_body(body: &str) -> String {
    let trimmed = body.trim().trim_end_matches(';').trim_end();

    if let Some(tag) = leading_dollar_tag(trimmed) {
        if trimmed.len() >= tag.len() * 2 && trimmed.ends_with(&tag) {
            return trimmed.to_string();
        }
    }

    let mut tag = "$$".to_string();
    let mut n = 0u32;
    while trimmed.contains(&tag) {
        n += 1;
        tag = if n == 1 {
            "$fn$".to_string()
        } else {
            format!("$fn{}$", n - 1)
        };
    }

    format!("{tag}\n{trimmed}\n{tag}")
}

/// Extract a leading dollar-quote tag (`$$`, `$body$`, ...) if present.
fn leading_dollar_tag(body: &str) -> Option<String> {
    let rest = body.strip_prefix('$')?;
    let end = rest.find('$')?;
    let label = &rest[..end];
    if label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(format!("${}$", label))
    } else {
        None
    }
}
