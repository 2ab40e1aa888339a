//! Generic CRUD over a repository, with soft delete and server-managed timestamps.

use crate::error::{RepositoryError, ServiceError};
use crate::response::Page;
use crate::schema::{from_object, to_object, Entity, EntitySchema, METADATA_COLUMNS};
use crate::store::{Filter, Repository};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Largest page a search returns.
pub const MAX_PAGE_SIZE: u64 = 1000;

pub struct CrudService<T: Entity> {
    repo: Arc<dyn Repository<T>>,
}

impl<T: Entity> Clone for CrudService<T> {
    fn clone(&self) -> Self {
        CrudService {
            repo: self.repo.clone(),
        }
    }
}

impl<T: Entity> CrudService<T> {
    pub fn new(repo: Arc<dyn Repository<T>>) -> Self {
        CrudService { repo }
    }

    pub fn schema(&self) -> &EntitySchema {
        self.repo.schema()
    }

    /// Page of non-deleted records matching `criteria`, or `None` when the page is empty.
    /// `page` is at least 1; `page_size` is clamped to `1..=MAX_PAGE_SIZE`. A page starting
    /// beyond any storable offset is empty.
    pub async fn search(
        &self,
        criteria: Filter,
        page: u64,
        page_size: u64,
    ) -> Result<Option<Page<T>>, ServiceError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let Some(offset) = (page - 1)
            .checked_mul(page_size)
            .filter(|&o| i64::try_from(o).is_ok())
        else {
            return Ok(None);
        };
        let (data, total) = self
            .repo
            .find_many(&criteria.not_deleted(), offset, page_size)
            .await?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(Page {
            data,
            total,
            page,
            page_size,
        }))
    }

    /// Non-deleted record by id.
    pub async fn consult(&self, id: i64) -> Result<Option<T>, ServiceError> {
        Ok(self.repo.find_one(&Filter::by_id(id).not_deleted()).await?)
    }

    /// Persist a new record. Id and timestamps supplied by the caller are replaced.
    pub async fn create(&self, mut entity: T) -> Result<T, ServiceError> {
        let now = Utc::now();
        let meta = entity.meta_mut();
        meta.id = 0;
        meta.created_at = Some(now);
        meta.updated_at = Some(now);
        meta.deleted_at = None;
        let saved = self.repo.save(entity).await?;
        tracing::debug!(table = %self.schema().table(), id = saved.id(), "created");
        Ok(saved)
    }

    /// Replace every domain field of record `id`. The entity must carry the same id.
    pub async fn update(&self, id: i64, mut entity: T) -> Result<T, ServiceError> {
        if entity.id() != id {
            let body = Some(entity.id()).filter(|&b| b != 0);
            return Err(ServiceError::IdMismatch { path: id, body });
        }
        let existing = self.existing(id).await?;
        let meta = entity.meta_mut();
        meta.created_at = existing.meta().created_at;
        meta.updated_at = Some(Utc::now());
        meta.deleted_at = None;
        Ok(self.repo.save(entity).await?)
    }

    /// Merge `partial` onto record `id`, one level deep. Metadata keys in `partial` are ignored.
    pub async fn patch(&self, id: i64, partial: Map<String, Value>) -> Result<T, ServiceError> {
        let existing = self.existing(id).await?;
        let mut merged = to_object(&existing).map_err(RepositoryError::from)?;
        for (property, value) in partial {
            if !METADATA_COLUMNS.contains(&property.as_str()) {
                merged.insert(property, value);
            }
        }
        let mut entity: T = from_object(merged).map_err(RepositoryError::from)?;
        entity.meta_mut().updated_at = Some(Utc::now());
        Ok(self.repo.save(entity).await?)
    }

    /// Mark record `id` deleted. A second delete of the same id is `NotFound`.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let mut existing = self.existing(id).await?;
        existing.meta_mut().deleted_at = Some(Utc::now());
        self.repo.soft_delete(existing).await?;
        tracing::debug!(table = %self.schema().table(), id, "soft deleted");
        Ok(())
    }

    async fn existing(&self, id: i64) -> Result<T, ServiceError> {
        self.consult(id).await?.ok_or(ServiceError::NotFound(id))
    }
}
