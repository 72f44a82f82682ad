//! Pattern extraction over generated SQL files.
//!
//! This is deliberately not a SQL parser. It recognizes exactly the
//! statement shapes the generation pipeline emits and turns them back
//! into descriptors. Anything else in the files is ignored.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::core::schema::{
    ColumnDef, ConstraintDef, ConstraintKind, FunctionDef, IdentityMode, IndexDef, ParamDef,
    ParamMode, SequenceDef, TableDef, TriggerDef, TriggerEvent, TriggerTiming, Volatility,
};
use crate::core::traits::SchemaSource;
use crate::error::{Result, SyncError};

use super::{PROCS_FILE, SCHEMA_FILE, TRIGGERS_FILE};

/// Metadata source backed by a directory of generated SQL files.
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    /// Open a directory containing generated schema files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SyncError::acquisition(
                format!("dir:{}", dir.display()),
                "not a directory",
            ));
        }
        Ok(Self { dir })
    }

    fn read_file(&self, file: &str, required: bool) -> Result<String> {
        let path = self.dir.join(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(_) if !required => Ok(String::new()),
            Err(e) => Err(SyncError::acquisition(
                self.name(),
                format!("cannot read {}: {}", path.display(), e),
            )),
        }
    }
}

#[async_trait]
impl SchemaSource for FileSource {
    fn name(&self) -> String {
        format!("dir:{}", self.dir.display())
    }

    async fn schema_exists(&self, _schema: &str) -> Result<bool> {
        Ok(self.dir.join(SCHEMA_FILE).is_file())
    }

    async fn list_tables(&self, _schema: &str) -> Result<Vec<TableDef>> {
        let content = self.read_file(SCHEMA_FILE, true)?;
        let tables = parse_tables(&content);
        debug!("Parsed {} tables from {}", tables.len(), self.name());
        Ok(tables)
    }

    async fn list_functions(&self, schema: &str) -> Result<Vec<FunctionDef>> {
        let content = self.read_file(PROCS_FILE, false)?;
        Ok(parse_functions(&content, schema))
    }

    async fn list_triggers(&self, schema: &str) -> Result<Vec<TriggerDef>> {
        let content = self.read_file(TRIGGERS_FILE, false)?;
        Ok(parse_triggers(&content, schema))
    }

    async fn list_sequences(&self, schema: &str) -> Result<Vec<SequenceDef>> {
        let content = self.read_file(SCHEMA_FILE, true)?;
        Ok(parse_sequences(&content, schema))
    }

    async fn close(&self) {}
}

fn strip_quotes(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}

fn split_ident_list(list: &str) -> Vec<String> {
    list.split(',').map(strip_quotes).collect()
}

/// Strip a leading `schema.` qualifier from an object reference.
fn unqualified(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, bare)) => strip_quotes(bare),
        None => strip_quotes(name),
    }
}

// =============================================================================
// Tables, constraints, indexes
// =============================================================================

fn parse_tables(content: &str) -> Vec<TableDef> {
    let table_re = Regex::new(r"(?ms)^CREATE TABLE (\S+) \(\n(.*?)\n\);$").unwrap();
    let comment_re = Regex::new(r"(?m)^COMMENT ON TABLE (\S+) IS '((?:[^']|'')*)';$").unwrap();

    let mut tables: Vec<TableDef> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for cap in table_re.captures_iter(content) {
        let qualified = cap.get(1).unwrap().as_str();
        let (schema, name) = match qualified.rsplit_once('.') {
            Some((s, n)) => (strip_quotes(s), strip_quotes(n)),
            None => (String::new(), strip_quotes(qualified)),
        };

        let columns = parse_column_lines(&name, cap.get(2).unwrap().as_str());

        by_name.insert(name.clone(), tables.len());
        tables.push(TableDef {
            schema,
            name,
            columns,
            constraints: vec![],
            indexes: vec![],
            sequences: vec![],
            comment: None,
        });
    }

    for cap in comment_re.captures_iter(content) {
        let table = unqualified(cap.get(1).unwrap().as_str());
        if let Some(&i) = by_name.get(&table) {
            tables[i].comment = Some(cap.get(2).unwrap().as_str().replace("''", "'"));
        }
    }

    for constraint in parse_constraints(content) {
        if let Some(&i) = by_name.get(&constraint.table) {
            tables[i].constraints.push(constraint);
        }
    }

    for index in parse_indexes(content) {
        if let Some(&i) = by_name.get(&index.table) {
            tables[i].indexes.push(index);
        }
    }

    tables
}

/// Parse the body lines of a CREATE TABLE statement.
fn parse_column_lines(table: &str, body: &str) -> Vec<ColumnDef> {
    let mut columns = Vec::new();

    for raw_line in body.lines() {
        let line = raw_line.trim().trim_end_matches(',');
        if line.is_empty() || line.starts_with("--") {
            continue;
        }

        let (name_part, mut rest) = match line.split_once(' ') {
            Some(parts) => parts,
            None => continue,
        };
        let name = strip_quotes(name_part);
        rest = rest.trim();

        let mut nullable = true;
        if let Some(stripped) = rest.strip_suffix("NOT NULL") {
            nullable = false;
            rest = stripped.trim_end();
        }

        let mut identity = None;
        let mut default = None;
        let mut generated = None;

        if let Some(stripped) = rest.strip_suffix("GENERATED ALWAYS AS IDENTITY") {
            identity = Some(IdentityMode::Always);
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix("GENERATED BY DEFAULT AS IDENTITY") {
            identity = Some(IdentityMode::ByDefault);
            rest = stripped.trim_end();
        } else if let Some(pos) = rest.find(" GENERATED ALWAYS AS (") {
            let expr_part = &rest[pos + " GENERATED ALWAYS AS (".len()..];
            if let Some(expr) = expr_part.strip_suffix(") STORED") {
                generated = Some(expr.to_string());
            }
            rest = rest[..pos].trim_end();
        } else if let Some(pos) = rest.find(" DEFAULT ") {
            default = Some(rest[pos + " DEFAULT ".len()..].to_string());
            rest = rest[..pos].trim_end();
        }

        let (data_type, max_length, precision, scale) = parse_type(rest);

        columns.push(ColumnDef {
            table: table.to_string(),
            name,
            data_type,
            max_length,
            precision,
            scale,
            nullable,
            default,
            identity,
            generated,
            ordinal: columns.len() as i32 + 1,
        });
    }

    columns
}

/// Split a rendered type into base name and length/precision/scale.
fn parse_type(rendered: &str) -> (String, i32, i32, i32) {
    let rendered = rendered.trim();

    let (base, args) = match rendered.find('(') {
        Some(pos) if rendered.ends_with(')') => (
            rendered[..pos].trim().to_string(),
            Some(&rendered[pos + 1..rendered.len() - 1]),
        ),
        _ => (rendered.to_string(), None),
    };

    let Some(args) = args else {
        return (base, 0, 0, 0);
    };

    let parts: Vec<i32> = args
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();

    // Length-typed bases take a length; everything else takes precision/scale.
    let length_typed = matches!(
        base.as_str(),
        "character varying" | "character" | "bit" | "bit varying"
    );

    match (length_typed, parts.as_slice()) {
        (true, [len]) => (base, *len, 0, 0),
        (false, [p]) => (base, 0, *p, 0),
        (false, [p, s]) => (base, 0, *p, *s),
        _ => (base, 0, 0, 0),
    }
}

fn parse_constraints(content: &str) -> Vec<ConstraintDef> {
    let pk_re = Regex::new(
        r"(?m)^ALTER TABLE (\S+) ADD CONSTRAINT (\S+) (PRIMARY KEY|UNIQUE) \(([^)]+)\);$",
    )
    .unwrap();
    let check_re =
        Regex::new(r"(?m)^ALTER TABLE (\S+) ADD CONSTRAINT (\S+) CHECK \((.*)\);$").unwrap();
    let fk_re = Regex::new(
        r"(?m)^ALTER TABLE (\S+) ADD CONSTRAINT (\S+) FOREIGN KEY \(([^)]+)\) REFERENCES (\S+) \(([^)]+)\)( ON UPDATE (CASCADE|RESTRICT|SET NULL|SET DEFAULT))?( ON DELETE (CASCADE|RESTRICT|SET NULL|SET DEFAULT))?( DEFERRABLE INITIALLY DEFERRED)?;$",
    )
    .unwrap();

    let mut constraints = Vec::new();

    for cap in pk_re.captures_iter(content) {
        let kind = if cap.get(3).unwrap().as_str() == "PRIMARY KEY" {
            ConstraintKind::PrimaryKey
        } else {
            ConstraintKind::Unique
        };
        constraints.push(ConstraintDef {
            table: unqualified(cap.get(1).unwrap().as_str()),
            name: strip_quotes(cap.get(2).unwrap().as_str()),
            kind,
            columns: split_ident_list(cap.get(4).unwrap().as_str()),
            foreign_schema: None,
            foreign_table: None,
            foreign_columns: vec![],
            update_rule: None,
            delete_rule: None,
            deferrable: false,
            check_clause: None,
        });
    }

    for cap in check_re.captures_iter(content) {
        constraints.push(ConstraintDef {
            table: unqualified(cap.get(1).unwrap().as_str()),
            name: strip_quotes(cap.get(2).unwrap().as_str()),
            kind: ConstraintKind::Check,
            columns: vec![],
            foreign_schema: None,
            foreign_table: None,
            foreign_columns: vec![],
            update_rule: None,
            delete_rule: None,
            deferrable: false,
            check_clause: Some(cap.get(3).unwrap().as_str().to_string()),
        });
    }

    for cap in fk_re.captures_iter(content) {
        let foreign = cap.get(4).unwrap().as_str();
        let foreign_schema = foreign
            .rsplit_once('.')
            .map(|(s, _)| strip_quotes(s));
        constraints.push(ConstraintDef {
            table: unqualified(cap.get(1).unwrap().as_str()),
            name: strip_quotes(cap.get(2).unwrap().as_str()),
            kind: ConstraintKind::ForeignKey,
            columns: split_ident_list(cap.get(3).unwrap().as_str()),
            foreign_schema,
            foreign_table: Some(unqualified(foreign)),
            foreign_columns: split_ident_list(cap.get(5).unwrap().as_str()),
            update_rule: Some(
                cap.get(7)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "NO ACTION".to_string()),
            ),
            delete_rule: Some(
                cap.get(9)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "NO ACTION".to_string()),
            ),
            deferrable: cap.get(10).is_some(),
            check_clause: None,
        });
    }

    constraints
}

fn parse_indexes(content: &str) -> Vec<IndexDef> {
    let re = Regex::new(
        r"(?m)^CREATE (UNIQUE )?INDEX (\S+) ON (\S+)(?: USING (\w+))? \(([^)]+)\)(?: WHERE (.+?))?;$",
    )
    .unwrap();

    re.captures_iter(content)
        .map(|cap| IndexDef {
            table: unqualified(cap.get(3).unwrap().as_str()),
            name: strip_quotes(cap.get(2).unwrap().as_str()),
            columns: split_ident_list(cap.get(5).unwrap().as_str()),
            is_unique: cap.get(1).is_some(),
            predicate: cap.get(6).map(|m| m.as_str().to_string()),
            method: cap
                .get(4)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "btree".to_string()),
            backs_constraint: false,
        })
        .collect()
}

fn parse_sequences(content: &str, schema: &str) -> Vec<SequenceDef> {
    let re = Regex::new(
        r"(?m)^CREATE SEQUENCE (\S+) AS (\w+) START WITH (-?\d+) INCREMENT BY (-?\d+) MINVALUE (-?\d+) MAXVALUE (-?\d+) (CYCLE|NO CYCLE);$",
    )
    .unwrap();

    re.captures_iter(content)
        .map(|cap| SequenceDef {
            schema: schema.to_string(),
            name: unqualified(cap.get(1).unwrap().as_str()),
            data_type: cap.get(2).unwrap().as_str().to_string(),
            start: cap.get(3).unwrap().as_str().parse().unwrap_or(1),
            increment: cap.get(4).unwrap().as_str().parse().unwrap_or(1),
            min_value: cap.get(5).unwrap().as_str().parse().unwrap_or(1),
            max_value: cap.get(6).unwrap().as_str().parse().unwrap_or(i64::MAX),
            cycle: cap.get(7).unwrap().as_str() == "CYCLE",
        })
        .collect()
}

// =============================================================================
// Functions / procedures
// =============================================================================

fn parse_functions(content: &str, schema: &str) -> Vec<FunctionDef> {
    let header_re = Regex::new(
        r"(?s)CREATE OR REPLACE (FUNCTION|PROCEDURE) (\S+?)\((.*?)\)\n(?:RETURNS ([^\n]+)\n)?LANGUAGE (\w+)( STABLE| IMMUTABLE)?( SECURITY DEFINER)?\nAS \$(\w*)\$\n",
    )
    .unwrap();

    let mut functions = Vec::new();

    for cap in header_re.captures_iter(content) {
        let is_procedure = cap.get(1).unwrap().as_str() == "PROCEDURE";
        let tag = format!("${}$", cap.get(8).unwrap().as_str());

        // Body runs from the end of the header match to the closing tag.
        let body_start = cap.get(0).unwrap().end();
        let Some(rel_end) = content[body_start..].find(&tag) else {
            continue;
        };
        let body = content[body_start..body_start + rel_end]
            .trim_end_matches('\n')
            .to_string();

        let returns = if is_procedure {
            "void".to_string()
        } else {
            cap.get(4)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| "void".to_string())
        };

        let volatility = match cap.get(6).map(|m| m.as_str().trim()) {
            Some("STABLE") => Volatility::Stable,
            Some("IMMUTABLE") => Volatility::Immutable,
            _ => Volatility::Volatile,
        };

        functions.push(FunctionDef {
            schema: schema.to_string(),
            name: unqualified(cap.get(2).unwrap().as_str()),
            params: parse_params(cap.get(3).unwrap().as_str()),
            returns,
            language: cap.get(5).unwrap().as_str().to_string(),
            body,
            volatility,
            security_definer: cap.get(7).is_some(),
            comment: None,
        });
    }

    functions
}

/// Split a parameter list on top-level commas (type arguments like
/// `numeric(10,2)` contain commas of their own).
fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in list.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Type-name words that can start an unnamed parameter's type.
fn is_type_word(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "character"
            | "timestamp"
            | "time"
            | "double"
            | "bit"
            | "numeric"
            | "decimal"
            | "text"
            | "integer"
            | "bigint"
            | "smallint"
            | "boolean"
            | "real"
            | "json"
            | "jsonb"
            | "uuid"
            | "date"
            | "bytea"
            | "interval"
            | "varchar"
    )
}

fn parse_params(list: &str) -> Vec<ParamDef> {
    split_top_level(list)
        .into_iter()
        .map(|part| {
            let mut rest = part.as_str();

            let mut mode = ParamMode::In;
            for (keyword, parsed) in [
                ("OUT ", ParamMode::Out),
                ("INOUT ", ParamMode::InOut),
                ("VARIADIC ", ParamMode::Variadic),
            ] {
                if let Some(stripped) = rest.strip_prefix(keyword) {
                    mode = parsed;
                    rest = stripped.trim_start();
                    break;
                }
            }

            let mut default = None;
            if let Some(pos) = rest.find(" DEFAULT ") {
                default = Some(rest[pos + " DEFAULT ".len()..].to_string());
                rest = rest[..pos].trim_end();
            }

            let (name, data_type) = match rest.split_once(' ') {
                Some((first, tail)) if !is_type_word(first) => {
                    (strip_quotes(first), tail.trim().to_string())
                }
                _ => (String::new(), rest.to_string()),
            };

            ParamDef {
                name,
                data_type,
                mode,
                default,
            }
        })
        .collect()
}

// =============================================================================
// Triggers
// =============================================================================

fn parse_triggers(content: &str, schema: &str) -> Vec<TriggerDef> {
    let re = Regex::new(
        r"(?m)^CREATE TRIGGER (\S+)\n\s+(BEFORE|AFTER|INSTEAD OF) ([A-Z ]+?) ON (\S+)\n\s+FOR EACH (ROW|STATEMENT)\n(?:\s+WHEN \((.+?)\)\n)?\s+EXECUTE FUNCTION (\S+?)\(\);$",
    )
    .unwrap();

    re.captures_iter(content)
        .map(|cap| {
            let events = cap
                .get(3)
                .unwrap()
                .as_str()
                .split(" OR ")
                .filter_map(|e| match e.trim() {
                    "INSERT" => Some(TriggerEvent::Insert),
                    "UPDATE" => Some(TriggerEvent::Update),
                    "DELETE" => Some(TriggerEvent::Delete),
                    "TRUNCATE" => Some(TriggerEvent::Truncate),
                    _ => None,
                })
                .collect();

            TriggerDef {
                schema: schema.to_string(),
                name: strip_quotes(cap.get(1).unwrap().as_str()),
                table: unqualified(cap.get(4).unwrap().as_str()),
                timing: match cap.get(2).unwrap().as_str() {
                    "BEFORE" => TriggerTiming::Before,
                    "INSTEAD OF" => TriggerTiming::InsteadOf,
                    _ => TriggerTiming::After,
                },
                events,
                function: unqualified(cap.get(7).unwrap().as_str()),
                when_clause: cap.get(6).map(|m| m.as_str().to_string()),
                for_each_row: cap.get(5).unwrap().as_str() == "ROW",
            }
        })
        .collect()
}
