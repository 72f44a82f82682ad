//! Catalog introspection: `pg_catalog` / `information_schema` rows into
//! descriptors.
//!
//! Every row is converted at this boundary; rows missing required fields
//! are rejected here rather than propagated as partially filled
//! descriptors.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::core::schema::{
    ColumnDef, ConstraintDef, ConstraintKind, FunctionDef, IdentityMode, IndexDef, ParamDef,
    ParamMode, SequenceDef, TableDef, TriggerDef, TriggerEvent, TriggerTiming, Volatility,
};
use crate::core::traits::SchemaSource;
use crate::error::{Result, SyncError};

/// Live PostgreSQL metadata source.
pub struct PostgresSource {
    pool: Pool,
    label: String,
}

impl PostgresSource {
    /// Connect to an endpoint and verify the connection.
    pub async fn connect(config: &EndpointConfig, max_conns: usize) -> Result<Self> {
        let pool = super::build_pool(config, max_conns).await?;
        Ok(Self {
            pool,
            label: config.label(),
        })
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SyncError::pool(e, format!("getting connection for {}", context)))
    }

    async fn load_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDef>> {
        let client = self.client("load_columns").await?;

        let query = r#"
            SELECT
                column_name,
                udt_name,
                COALESCE(character_maximum_length, 0)::int4,
                COALESCE(numeric_precision, datetime_precision, 0)::int4,
                COALESCE(numeric_scale, 0)::int4,
                CASE WHEN is_nullable = 'YES' THEN true ELSE false END,
                column_default,
                identity_generation,
                generation_expression,
                ordinal_position::int4
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnDef {
                table: table.to_string(),
                name: row.get::<_, String>(0),
                data_type: row.get::<_, String>(1),
                max_length: row.get::<_, i32>(2),
                precision: row.get::<_, i32>(3),
                scale: row.get::<_, i32>(4),
                nullable: row.get::<_, bool>(5),
                default: row.get::<_, Option<String>>(6),
                identity: parse_identity(row.get::<_, Option<String>>(7).as_deref()),
                generated: row
                    .get::<_, Option<String>>(8)
                    .filter(|expr| !expr.is_empty()),
                ordinal: row.get::<_, i32>(9),
            });
        }

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn load_constraints(&self, schema: &str, table: &str) -> Result<Vec<ConstraintDef>> {
        let client = self.client("load_constraints").await?;

        let query = r#"
            SELECT
                c.conname,
                c.contype::text,
                ARRAY(
                    SELECT a.attname::text
                    FROM pg_catalog.pg_attribute a
                    WHERE a.attrelid = c.conrelid AND a.attnum = ANY(c.conkey)
                    ORDER BY array_position(c.conkey, a.attnum)
                ),
                fn.nspname::text,
                ft.relname::text,
                ARRAY(
                    SELECT a.attname::text
                    FROM pg_catalog.pg_attribute a
                    WHERE a.attrelid = c.confrelid AND a.attnum = ANY(c.confkey)
                    ORDER BY array_position(c.confkey, a.attnum)
                ),
                c.confupdtype::text,
                c.confdeltype::text,
                c.condeferrable AND c.condeferred,
                pg_get_constraintdef(c.oid)
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            LEFT JOIN pg_catalog.pg_class ft ON ft.oid = c.confrelid
            LEFT JOIN pg_catalog.pg_namespace fn ON fn.oid = ft.relnamespace
            WHERE n.nspname = $1 AND t.relname = $2 AND c.contype IN ('p', 'f', 'u', 'c')
            ORDER BY c.conname
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;

        let mut constraints = Vec::with_capacity(rows.len());
        for row in rows {
            let contype: String = row.get(1);
            let kind = match contype.as_str() {
                "p" => ConstraintKind::PrimaryKey,
                "f" => ConstraintKind::ForeignKey,
                "u" => ConstraintKind::Unique,
                "c" => ConstraintKind::Check,
                other => {
                    return Err(SyncError::acquisition(
                        self.label.clone(),
                        format!("unexpected constraint type '{}' on {}", other, table),
                    ));
                }
            };

            let definition: String = row.get(9);
            let is_fk = kind == ConstraintKind::ForeignKey;

            constraints.push(ConstraintDef {
                table: table.to_string(),
                name: row.get::<_, String>(0),
                kind,
                columns: row.get::<_, Vec<String>>(2),
                foreign_schema: row.get::<_, Option<String>>(3).filter(|_| is_fk),
                foreign_table: row.get::<_, Option<String>>(4).filter(|_| is_fk),
                foreign_columns: if is_fk {
                    row.get::<_, Vec<String>>(5)
                } else {
                    Vec::new()
                },
                update_rule: if is_fk {
                    Some(referential_action(&row.get::<_, String>(6)).to_string())
                } else {
                    None
                },
                delete_rule: if is_fk {
                    Some(referential_action(&row.get::<_, String>(7)).to_string())
                } else {
                    None
                },
                deferrable: row.get::<_, bool>(8),
                check_clause: if kind == ConstraintKind::Check {
                    extract_check_clause(&definition)
                } else {
                    None
                },
            });
        }

        debug!(
            "Loaded {} constraints for {}.{}",
            constraints.len(),
            schema,
            table
        );
        Ok(constraints)
    }

    async fn load_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexDef>> {
        let client = self.client("load_indexes").await?;

        let query = r#"
            SELECT
                i.relname,
                ARRAY(
                    SELECT pg_get_indexdef(ix.indexrelid, k.n, true)
                    FROM generate_series(1, ix.indnatts::int) AS k(n)
                ),
                ix.indisunique,
                pg_get_expr(ix.indpred, ix.indrelid),
                am.amname,
                EXISTS (
                    SELECT 1 FROM pg_catalog.pg_constraint cc
                    WHERE cc.conindid = ix.indexrelid
                )
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_am am ON am.oid = i.relam
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY i.relname
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;

        let mut indexes = Vec::with_capacity(rows.len());
        for row in rows {
            indexes.push(IndexDef {
                table: table.to_string(),
                name: row.get::<_, String>(0),
                columns: row
                    .get::<_, Vec<Option<String>>>(1)
                    .into_iter()
                    .flatten()
                    .filter(|c| !c.is_empty())
                    .collect(),
                is_unique: row.get::<_, bool>(2),
                predicate: row.get::<_, Option<String>>(3),
                method: row.get::<_, String>(4),
                backs_constraint: row.get::<_, bool>(5),
            });
        }

        debug!("Loaded {} indexes for {}.{}", indexes.len(), schema, table);
        Ok(indexes)
    }

    async fn load_owned_sequences(&self, schema: &str, table: &str) -> Result<Vec<SequenceDef>> {
        let client = self.client("load_owned_sequences").await?;

        let query = r#"
            SELECT
                s.sequencename,
                s.data_type::text,
                s.start_value,
                s.increment_by,
                s.min_value,
                s.max_value,
                s.cycle
            FROM pg_catalog.pg_sequences s
            WHERE s.schemaname = $1 AND EXISTS (
                SELECT 1
                FROM pg_catalog.pg_depend d
                JOIN pg_catalog.pg_class sc ON sc.oid = d.objid AND sc.relkind = 'S'
                JOIN pg_catalog.pg_namespace sn ON sn.oid = sc.relnamespace
                JOIN pg_catalog.pg_class t ON t.oid = d.refobjid
                WHERE d.deptype = 'a'
                  AND sc.relname = s.sequencename
                  AND sn.nspname = s.schemaname
                  AND t.relname = $2
            )
            ORDER BY s.sequencename
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;
        Ok(rows.iter().map(|row| sequence_from_row(schema, row)).collect())
    }
}

#[async_trait]
impl SchemaSource for PostgresSource {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn schema_exists(&self, schema: &str) -> Result<bool> {
        let client = self.client("schema_exists").await?;
        let row = client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.schemata WHERE schema_name = $1
                )",
                &[&schema],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableDef>> {
        let client = self.client("list_tables").await?;

        let query = r#"
            SELECT c.relname, obj_description(c.oid, 'pg_class')
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relkind = 'r'
            ORDER BY c.relname
        "#;

        let rows = client.query(query, &[&schema]).await?;
        drop(client);

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get(0);
            let comment: Option<String> = row.get(1);

            let columns = self.load_columns(schema, &name).await?;
            let constraints = self.load_constraints(schema, &name).await?;
            let indexes = self.load_indexes(schema, &name).await?;
            let sequences = self.load_owned_sequences(schema, &name).await?;

            tables.push(TableDef {
                schema: schema.to_string(),
                name,
                columns,
                constraints,
                indexes,
                sequences,
                comment,
            });
        }

        debug!("Loaded {} tables from {}", tables.len(), self.label);
        Ok(tables)
    }

    async fn list_functions(&self, schema: &str) -> Result<Vec<FunctionDef>> {
        let client = self.client("list_functions").await?;

        let query = r#"
            SELECT
                p.proname,
                COALESCE(p.proargnames, ARRAY[]::text[]),
                COALESCE(p.proargmodes::text[], ARRAY[]::text[]),
                ARRAY(
                    SELECT format_type(t.typ, NULL)
                    FROM unnest(COALESCE(p.proallargtypes, p.proargtypes::oid[])) AS t(typ)
                ),
                COALESCE(pg_get_function_result(p.oid), 'void'),
                l.lanname,
                p.prosrc,
                p.provolatile::text,
                p.prosecdef,
                obj_description(p.oid, 'pg_proc')
            FROM pg_catalog.pg_proc p
            JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
            JOIN pg_catalog.pg_language l ON l.oid = p.prolang
            WHERE n.nspname = $1 AND p.prokind IN ('f', 'p')
            ORDER BY p.proname
        "#;

        let rows = client.query(query, &[&schema]).await?;

        let mut functions = Vec::with_capacity(rows.len());
        for row in rows {
            let names: Vec<String> = row.get(1);
            let modes: Vec<String> = row.get(2);
            let types: Vec<String> = row.get(3);

            let params = build_params(&names, &modes, &types);

            functions.push(FunctionDef {
                schema: schema.to_string(),
                name: row.get::<_, String>(0),
                params,
                returns: row.get::<_, String>(4),
                language: row.get::<_, String>(5),
                body: row.get::<_, String>(6),
                volatility: parse_volatility(&row.get::<_, String>(7)),
                security_definer: row.get::<_, bool>(8),
                comment: row.get::<_, Option<String>>(9),
            });
        }

        debug!(
            "Loaded {} functions from {}.{}",
            functions.len(),
            self.label,
            schema
        );
        Ok(functions)
    }

    async fn list_triggers(&self, schema: &str) -> Result<Vec<TriggerDef>> {
        let client = self.client("list_triggers").await?;

        let query = r#"
            SELECT
                tg.tgname,
                t.relname,
                tg.tgtype::int4,
                p.proname,
                pg_get_triggerdef(tg.oid)
            FROM pg_catalog.pg_trigger tg
            JOIN pg_catalog.pg_class t ON t.oid = tg.tgrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_proc p ON p.oid = tg.tgfoid
            WHERE n.nspname = $1 AND NOT tg.tgisinternal
            ORDER BY tg.tgname
        "#;

        let rows = client.query(query, &[&schema]).await?;

        let mut triggers = Vec::with_capacity(rows.len());
        for row in rows {
            let tgtype: i32 = row.get(2);
            let definition: String = row.get(4);

            triggers.push(TriggerDef {
                schema: schema.to_string(),
                name: row.get::<_, String>(0),
                table: row.get::<_, String>(1),
                timing: trigger_timing(tgtype),
                events: trigger_events(tgtype),
                function: row.get::<_, String>(3),
                when_clause: extract_when_clause(&definition),
                for_each_row: tgtype & 1 != 0,
            });
        }

        debug!(
            "Loaded {} triggers from {}.{}",
            triggers.len(),
            self.label,
            schema
        );
        Ok(triggers)
    }

    async fn list_sequences(&self, schema: &str) -> Result<Vec<SequenceDef>> {
        let client = self.client("list_sequences").await?;

        let query = r#"
            SELECT
                s.sequencename,
                s.data_type::text,
                s.start_value,
                s.increment_by,
                s.min_value,
                s.max_value,
                s.cycle
            FROM pg_catalog.pg_sequences s
            WHERE s.schemaname = $1
            ORDER BY s.sequencename
        "#;

        let rows = client.query(query, &[&schema]).await?;
        Ok(rows.iter().map(|row| sequence_from_row(schema, row)).collect())
    }

    async fn close(&self) {
        self.pool.close();
        debug!("Closed pool for {}", self.label);
    }
}

fn sequence_from_row(schema: &str, row: &tokio_postgres::Row) -> SequenceDef {
    SequenceDef {
        schema: schema.to_string(),
        name: row.get::<_, String>(0),
        data_type: row.get::<_, String>(1),
        start: row.get::<_, i64>(2),
        increment: row.get::<_, i64>(3),
        min_value: row.get::<_, i64>(4),
        max_value: row.get::<_, i64>(5),
        cycle: row.get::<_, bool>(6),
    }
}

/// Decode information_schema identity_generation.
fn parse_identity(value: Option<&str>) -> Option<IdentityMode> {
    match value {
        Some("ALWAYS") => Some(IdentityMode::Always),
        Some("BY DEFAULT") => Some(IdentityMode::ByDefault),
        _ => None,
    }
}

/// Decode pg_proc.provolatile.
fn parse_volatility(code: &str) -> Volatility {
    match code {
        "i" => Volatility::Immutable,
        "s" => Volatility::Stable,
        _ => Volatility::Volatile,
    }
}

/// Decode pg_constraint confupdtype / confdeltype.
fn referential_action(code: &str) -> &'static str {
    match code {
        "c" => "CASCADE",
        "r" => "RESTRICT",
        "n" => "SET NULL",
        "d" => "SET DEFAULT",
        _ => "NO ACTION",
    }
}

/// Pull the inner expression out of `CHECK (expr)` from
/// pg_get_constraintdef output.
fn extract_check_clause(definition: &str) -> Option<String> {
    let start = definition.find("CHECK (")? + "CHECK (".len();
    let end = definition.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(definition[start..end].trim().to_string())
}

/// Pull the WHEN condition out of pg_get_triggerdef output.
fn extract_when_clause(definition: &str) -> Option<String> {
    let start = definition.find(" WHEN (")? + " WHEN (".len();
    let end = definition[start..].find(") EXECUTE")? + start;
    Some(definition[start..end].trim().to_string())
}

/// Decode pg_trigger.tgtype timing bits.
fn trigger_timing(tgtype: i32) -> TriggerTiming {
    if tgtype & 64 != 0 {
        TriggerTiming::InsteadOf
    } else if tgtype & 2 != 0 {
        TriggerTiming::Before
    } else {
        TriggerTiming::After
    }
}

/// Decode pg_trigger.tgtype event bits.
fn trigger_events(tgtype: i32) -> Vec<TriggerEvent> {
    let mut events = Vec::new();
    if tgtype & 4 != 0 {
        events.push(TriggerEvent::Insert);
    }
    if tgtype & 8 != 0 {
        events.push(TriggerEvent::Delete);
    }
    if tgtype & 16 != 0 {
        events.push(TriggerEvent::Update);
    }
    if tgtype & 32 != 0 {
        events.push(TriggerEvent::Truncate);
    }
    events
}

/// Zip pg_proc parallel arrays into parameter descriptors.
///
/// proargmodes is empty when every parameter is IN; proargnames is empty
/// when no parameter is named.
fn build_params(names: &[String], modes: &[String], types: &[String]) -> Vec<ParamDef> {
    types
        .iter()
        .enumerate()
        .map(|(i, data_type)| ParamDef {
            name: names.get(i).cloned().unwrap_or_default(),
            data_type: data_type.clone(),
            mode: match modes.get(i).map(String::as_str) {
                Some("o") | Some("t") => ParamMode::Out,
                Some("b") => ParamMode::InOut,
                Some("v") => ParamMode::Variadic,
                _ => ParamMode::In,
            },
            default: None,
        })
        .collect()
}
