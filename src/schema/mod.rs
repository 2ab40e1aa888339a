//! Entity schema descriptors: explicit column sets per entity type.

pub mod column;
pub mod entity;

pub use column::{ColumnDescriptor, ColumnKind};
pub use entity::{
    from_object, to_object, Entity, EntityMetadata, EntitySchema, CREATED_AT, DELETED_AT, ID,
    METADATA_COLUMNS, UPDATED_AT,
};
