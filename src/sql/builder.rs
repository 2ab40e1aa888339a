//! Builds parameterized SELECT, INSERT, UPDATE and DDL from an entity schema.
//! Identifiers come from the schema only; every value is a parameter cast to its column type.

use crate::case::column_name;
use crate::schema::{ColumnDescriptor, EntitySchema, DELETED_AT, ID};
use crate::store::Filter;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from schema).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified table of an entity.
pub fn qualified_table(pg_schema: &str, schema: &EntitySchema) -> String {
    format!("{}.{}", quoted(pg_schema), quoted(schema.table()))
}

fn quoted_column(c: &ColumnDescriptor) -> String {
    quoted(&column_name(&c.property_name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a value and return its cast placeholder, e.g. `$2::date`.
    fn push_param(&mut self, v: Value, column: &ColumnDescriptor) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), column.kind.sql_type())
    }
}

fn select_column_list(schema: &EntitySchema) -> String {
    schema
        .columns()
        .iter()
        .map(quoted_column)
        .collect::<Vec<_>>()
        .join(", ")
}

/// WHERE clause for a filter. Properties outside the schema are skipped.
fn where_clause(q: &mut QueryBuf, schema: &EntitySchema, filter: &Filter) -> String {
    let mut parts = Vec::new();
    for (property, value) in filter.conditions() {
        let Some(column) = schema.column(property) else {
            continue;
        };
        if value.is_null() {
            parts.push(format!("{} IS NULL", quoted_column(column)));
        } else {
            let ph = q.push_param(value.clone(), column);
            parts.push(format!("{} = {}", quoted_column(column), ph));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT matching rows ORDER BY id with LIMIT/OFFSET.
pub fn select_page(
    pg_schema: &str,
    schema: &EntitySchema,
    filter: &Filter,
    offset: u64,
    limit: u64,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema);
    let where_sql = where_clause(&mut q, schema, filter);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(schema),
        table,
        where_sql,
        quoted_column(schema.primary_key()),
        limit,
        offset
    );
    q
}

/// SELECT COUNT(*) of matching rows.
pub fn count(pg_schema: &str, schema: &EntitySchema, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema);
    let where_sql = where_clause(&mut q, schema, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_sql);
    q
}

/// First matching row by id.
pub fn select_one(pg_schema: &str, schema: &EntitySchema, filter: &Filter) -> QueryBuf {
    select_page(pg_schema, schema, filter, 0, 1)
}

/// INSERT every column except the primary key; values missing from the record bind as NULL.
pub fn insert(pg_schema: &str, schema: &EntitySchema, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in schema.columns().iter().filter(|c| !c.is_primary) {
        let val = record.get(&c.property_name).cloned().unwrap_or(Value::Null);
        placeholders.push(q.push_param(val, c));
        cols.push(quoted_column(c));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(schema)
    );
    q
}

/// UPDATE every non-key column of the row with the record's id.
pub fn update(pg_schema: &str, schema: &EntitySchema, id: i64, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema);
    let mut sets = Vec::new();
    for c in schema.columns().iter().filter(|c| !c.is_primary) {
        let val = record.get(&c.property_name).cloned().unwrap_or(Value::Null);
        let ph = q.push_param(val, c);
        sets.push(format!("{} = {}", quoted_column(c), ph));
    }
    let pk = schema.primary_key();
    let id_ph = q.push_param(Value::from(id), pk);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table,
        sets.join(", "),
        quoted_column(pk),
        id_ph,
        select_column_list(schema)
    );
    q
}

/// Set the deletion mark of one row.
pub fn soft_delete(pg_schema: &str, schema: &EntitySchema, id: i64, deleted_at: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(pg_schema, schema);
    let mark = schema
        .column(DELETED_AT)
        .map(|c| (quoted_column(c), q.push_param(deleted_at, c)));
    let pk = schema.primary_key();
    let id_ph = q.push_param(Value::from(id), pk);
    if let Some((col, ph)) = mark {
        q.sql = format!(
            "UPDATE {} SET {} = {} WHERE {} = {}",
            table,
            col,
            ph,
            quoted_column(pk),
            id_ph
        );
    }
    q
}

/// CREATE SCHEMA / CREATE TABLE IF NOT EXISTS for the entity.
pub fn create_table(pg_schema: &str, schema: &EntitySchema) -> Vec<String> {
    let mut defs = Vec::new();
    for c in schema.columns() {
        let mut def = if c.property_name == ID {
            format!("{} BIGSERIAL", quoted_column(c))
        } else {
            format!("{} {}", quoted_column(c), c.kind.sql_type().to_uppercase())
        };
        if !c.is_nullable && !c.is_primary {
            def.push_str(" NOT NULL");
        }
        if EntitySchema::is_metadata(&c.property_name) && !c.is_nullable && !c.is_primary {
            def.push_str(" DEFAULT NOW()");
        }
        defs.push(def);
    }
    defs.push(format!("PRIMARY KEY ({})", quoted_column(schema.primary_key())));
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(pg_schema)),
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            qualified_table(pg_schema, schema),
            defs.join(", ")
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity::tests::Car;
    use crate::schema::Entity;
    use serde_json::json;

    #[test]
    fn page_query_filters_and_paginates() {
        let schema = Car::schema();
        let filter = Filter::new().eq("wheels", json!(4)).not_deleted();
        let q = select_page("public", &schema, &filter, 20, 10);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"model\", \"wheels\", \"release_date\", \"nickname\", \"created_at\", \"updated_at\", \"deleted_at\" \
             FROM \"public\".\"cars\" WHERE \"wheels\" = $1::integer AND \"deleted_at\" IS NULL \
             ORDER BY \"id\" LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.params, vec![json!(4)]);
    }

    #[test]
    fn unknown_filter_properties_never_reach_sql() {
        let schema = Car::schema();
        let filter = Filter::new().eq("color\"; DROP TABLE cars; --", json!("red"));
        let q = count("public", &schema, &filter);
        assert_eq!(q.sql, "SELECT COUNT(*) FROM \"public\".\"cars\"");
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_skips_primary_key() {
        let schema = Car::schema();
        let record = match json!({"id": 0, "model": "Toyota", "wheels": 4, "releaseDate": "2021-01-01"}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        let q = insert("public", &schema, &record);
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"cars\" (\"model\", \"wheels\", \"release_date\", \"nickname\", \"created_at\", \"updated_at\", \"deleted_at\") \
             VALUES ($1::text, $2::integer, $3::date, $4::text, $5::timestamptz, $6::timestamptz, $7::timestamptz) RETURNING"
        ));
        assert_eq!(q.params[0], json!("Toyota"));
        assert_eq!(q.params[3], Value::Null);
    }

    #[test]
    fn update_binds_id_last() {
        let schema = Car::schema();
        let q = update("public", &schema, 5, &Map::new());
        assert!(q.sql.contains("WHERE \"id\" = $8::bigint RETURNING"));
        assert_eq!(q.params.last(), Some(&json!(5)));
    }

    #[test]
    fn soft_delete_only_touches_the_mark() {
        let schema = Car::schema();
        let q = soft_delete("public", &schema, 3, json!("2024-01-01T00:00:00Z"));
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"cars\" SET \"deleted_at\" = $1::timestamptz WHERE \"id\" = $2::bigint"
        );
    }

    #[test]
    fn ddl_declares_metadata_defaults() {
        let ddl = create_table("fleet", &Car::schema());
        assert_eq!(ddl[0], "CREATE SCHEMA IF NOT EXISTS \"fleet\"");
        assert!(ddl[1].contains("\"id\" BIGSERIAL"));
        assert!(ddl[1].contains("\"wheels\" INTEGER NOT NULL"));
        assert!(ddl[1].contains("\"created_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(ddl[1].contains("\"deleted_at\" TIMESTAMPTZ,"));
        assert!(ddl[1].ends_with("PRIMARY KEY (\"id\"))"));
    }
}
