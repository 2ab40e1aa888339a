//! PostgreSQL repository: one table per entity, snake_case columns.

use crate::case::row_to_properties;
use crate::error::RepositoryError;
use crate::schema::{from_object, to_object, Entity, EntitySchema, DELETED_AT};
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{Filter, Repository};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::marker::PhantomData;

pub struct PgRepository<T> {
    pool: PgPool,
    pg_schema: String,
    schema: EntitySchema,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PgRepository<T> {
    pub fn new(pool: PgPool, pg_schema: impl Into<String>) -> Self {
        PgRepository {
            pool,
            pg_schema: pg_schema.into(),
            schema: T::schema(),
            _entity: PhantomData,
        }
    }

    /// Create the schema and table when missing. Existing tables are left as they are.
    pub async fn ensure_table(&self) -> Result<(), RepositoryError> {
        for ddl in sql::create_table(&self.pg_schema, &self.schema) {
            tracing::debug!(sql = %ddl, "ddl");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_many(&self, q: &QueryBuf) -> Result<Vec<T>, RepositoryError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(&q.sql, &q.params).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_entity::<T>).collect()
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<T>, RepositoryError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(&q.sql, &q.params).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_entity::<T>).transpose()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for PgRepository<T> {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    async fn find_many(
        &self,
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<T>, u64), RepositoryError> {
        let q = sql::count(&self.pg_schema, &self.schema, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut count = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            count = count.bind(sql::text_param(p));
        }
        let total = count.fetch_one(&self.pool).await?;
        let q = sql::select_page(&self.pg_schema, &self.schema, filter, offset, limit);
        let data = self.fetch_many(&q).await?;
        Ok((data, total.max(0) as u64))
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, RepositoryError> {
        let q = sql::select_one(&self.pg_schema, &self.schema, filter);
        self.fetch_optional(&q).await
    }

    async fn save(&self, record: T) -> Result<T, RepositoryError> {
        let object = to_object(&record)?;
        let q = if record.id() == 0 {
            sql::insert(&self.pg_schema, &self.schema, &object)
        } else {
            sql::update(&self.pg_schema, &self.schema, record.id(), &object)
        };
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| RepositoryError::Db(sqlx::Error::RowNotFound))
    }

    async fn soft_delete(&self, record: T) -> Result<(), RepositoryError> {
        let deleted_at = to_object(&record)?
            .remove(DELETED_AT)
            .unwrap_or(Value::Null);
        let q = sql::soft_delete(&self.pg_schema, &self.schema, record.id(), deleted_at);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let done = bind_all(&q.sql, &q.params).execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::Db(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

fn row_to_entity<T: Entity>(row: &sqlx::postgres::PgRow) -> Result<T, RepositoryError> {
    Ok(from_object(row_to_properties(row_to_json(row)))?)
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> serde_json::Map<String, Value> {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
