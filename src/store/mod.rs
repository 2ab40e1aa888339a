//! Repository collaborator: the storage operations the CRUD service relies on.

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

use crate::error::RepositoryError;
use crate::schema::{Entity, EntitySchema, DELETED_AT, ID};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Exact-match conditions, ANDed, in insertion order. A `null` value means "is null".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn by_id(id: i64) -> Self {
        Filter::new().eq(ID, Value::from(id))
    }

    pub fn eq(mut self, property: impl Into<String>, value: Value) -> Self {
        self.push(property, value);
        self
    }

    pub fn push(&mut self, property: impl Into<String>, value: Value) {
        self.conditions.push((property.into(), value));
    }

    /// Exclude soft-deleted records.
    pub fn not_deleted(self) -> Self {
        self.eq(DELETED_AT, Value::Null)
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a record (as a JSON object) satisfies every condition.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|(property, expected)| {
            let actual = record.get(property).unwrap_or(&Value::Null);
            value_eq(actual, expected)
        })
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

/// Storage for one entity type. Implementations own concurrency and atomicity;
/// callers get no isolation beyond what a single call provides.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync + 'static {
    fn schema(&self) -> &EntitySchema;

    /// Matching records ordered by id, skipping `offset` and returning at most `limit`,
    /// plus the total match count before pagination.
    async fn find_many(
        &self,
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<T>, u64), RepositoryError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, RepositoryError>;

    /// Insert when the record has no id yet, otherwise replace the stored record.
    async fn save(&self, record: T) -> Result<T, RepositoryError>;

    /// Persist the record's deletion mark. The row is kept.
    async fn soft_delete(&self, record: T) -> Result<(), RepositoryError>;
}
