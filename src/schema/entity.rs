//! Entity schema and the capability set every resource entity provides.

use crate::schema::column::{ColumnDescriptor, ColumnKind};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const DELETED_AT: &str = "deletedAt";

/// Columns present on every entity and never subject to required-field checks.
pub const METADATA_COLUMNS: [&str; 4] = [ID, CREATED_AT, UPDATED_AT, DELETED_AT];

/// Read-only column set of one entity type. Built once at startup.
#[derive(Clone, Debug)]
pub struct EntitySchema {
    table: String,
    /// `id` is always first.
    columns: Vec<ColumnDescriptor>,
}

impl EntitySchema {
    /// Schema for `table`: `id`, the given domain columns in declaration order, then the
    /// timestamp columns. Domain columns reusing a metadata name are ignored.
    pub fn new(table: impl Into<String>, domain: Vec<ColumnDescriptor>) -> Self {
        let mut columns = Vec::with_capacity(domain.len() + METADATA_COLUMNS.len());
        columns.push(ColumnDescriptor::primary(ID));
        columns.extend(
            domain
                .into_iter()
                .filter(|c| !Self::is_metadata(&c.property_name)),
        );
        columns.push(ColumnDescriptor::required(CREATED_AT, ColumnKind::Timestamptz));
        columns.push(ColumnDescriptor::required(UPDATED_AT, ColumnKind::Timestamptz));
        columns.push(ColumnDescriptor::optional(DELETED_AT, ColumnKind::Timestamptz));
        EntitySchema {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, property_name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property_name == property_name)
    }

    pub fn contains(&self, property_name: &str) -> bool {
        self.column(property_name).is_some()
    }

    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[0]
    }

    pub fn is_metadata(property_name: &str) -> bool {
        METADATA_COLUMNS.contains(&property_name)
    }

    pub fn domain_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| !Self::is_metadata(&c.property_name))
    }

    /// Non-nullable, non-primary, non-metadata columns.
    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.domain_columns()
            .filter(|c| !c.is_nullable && !c.is_primary)
    }
}

/// Metadata fields shared by every entity. Flatten into the entity struct.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    /// 0 until the repository assigns one.
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A type the CRUD service and controller can manage.
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Car {
///     #[serde(flatten)]
///     meta: EntityMetadata,
///     model: String,
///     wheels: i32,
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn schema() -> EntitySchema;

    fn meta(&self) -> &EntityMetadata;

    fn meta_mut(&mut self) -> &mut EntityMetadata;

    fn id(&self) -> i64 {
        self.meta().id
    }

    fn is_deleted(&self) -> bool {
        self.meta().deleted_at.is_some()
    }
}

/// Entity as a JSON object keyed by property name.
pub fn to_object<T: Entity>(entity: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(entity)? {
        Value::Object(m) => Ok(m),
        other => Err(serde::ser::Error::custom(format!(
            "entity must serialize to an object, got {}",
            other
        ))),
    }
}

pub fn from_object<T: Entity>(object: Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(object))
}
