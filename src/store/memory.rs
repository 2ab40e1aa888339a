//! Process-local repository. Ids are assigned sequentially from 1.

use crate::error::RepositoryError;
use crate::schema::{to_object, Entity, EntitySchema};
use crate::store::{Filter, Repository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

struct Rows<T> {
    by_id: BTreeMap<i64, T>,
    last_id: i64,
}

pub struct InMemoryRepository<T> {
    schema: EntitySchema,
    rows: RwLock<Rows<T>>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        InMemoryRepository {
            schema: T::schema(),
            rows: RwLock::new(Rows {
                by_id: BTreeMap::new(),
                last_id: 0,
            }),
        }
    }

    /// Stored row by id regardless of its deletion mark.
    pub fn raw(&self, id: i64) -> Result<Option<T>, RepositoryError> {
        Ok(self.read()?.by_id.get(&id).cloned())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Rows<T>>, RepositoryError> {
        self.rows
            .read()
            .map_err(|_| RepositoryError::Other("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Rows<T>>, RepositoryError> {
        self.rows
            .write()
            .map_err(|_| RepositoryError::Other("in-memory store lock poisoned".into()))
    }

    fn matching(&self, filter: &Filter) -> Result<Vec<T>, RepositoryError> {
        let rows = self.read()?;
        let mut out = Vec::new();
        for row in rows.by_id.values() {
            if filter.matches(&to_object(row)?) {
                out.push(row.clone());
            }
        }
        Ok(out)
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    async fn find_many(
        &self,
        filter: &Filter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<T>, u64), RepositoryError> {
        let all = self.matching(filter)?;
        let total = all.len() as u64;
        let data = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((data, total))
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, RepositoryError> {
        Ok(self.matching(filter)?.into_iter().next())
    }

    async fn save(&self, mut record: T) -> Result<T, RepositoryError> {
        let mut rows = self.write()?;
        if record.id() == 0 {
            rows.last_id += 1;
            record.meta_mut().id = rows.last_id;
        }
        rows.by_id.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn soft_delete(&self, record: T) -> Result<(), RepositoryError> {
        let mut rows = self.write()?;
        match rows.by_id.get_mut(&record.id()) {
            Some(stored) => {
                stored.meta_mut().deleted_at = record.meta().deleted_at;
                Ok(())
            }
            None => Err(RepositoryError::Other(format!(
                "record {} is not stored",
                record.id()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity::tests::{toyota, Car};
    use serde_json::json;

    #[tokio::test]
    async fn save_assigns_sequential_ids() {
        let repo = InMemoryRepository::<Car>::new();
        let a = repo.save(toyota()).await.unwrap();
        let b = repo.save(toyota()).await.unwrap();
        assert_eq!((a.id(), b.id()), (1, 2));
        assert_eq!(repo.raw(2).unwrap(), Some(b));
        assert_eq!(repo.raw(3).unwrap(), None);
    }

    #[tokio::test]
    async fn find_many_paginates_and_counts() {
        let repo = InMemoryRepository::<Car>::new();
        for wheels in [3, 4, 4, 4, 6] {
            let mut car = toyota();
            car.wheels = wheels;
            repo.save(car).await.unwrap();
        }
        let filter = Filter::new().eq("wheels", json!(4));
        let (page, total) = repo.find_many(&filter, 1, 1).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id(), 3);
    }

    #[tokio::test]
    async fn soft_delete_keeps_the_row() {
        let repo = InMemoryRepository::<Car>::new();
        let mut car = repo.save(toyota()).await.unwrap();
        car.meta.deleted_at = Some(chrono::Utc::now());
        repo.soft_delete(car).await.unwrap();
        assert!(repo.raw(1).unwrap().unwrap().is_deleted());
        assert!(repo
            .find_one(&Filter::by_id(1).not_deleted())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn soft_delete_of_unknown_record_fails() {
        let repo = InMemoryRepository::<Car>::new();
        let mut car = toyota();
        car.meta.id = 42;
        assert!(repo.soft_delete(car).await.is_err());
    }
}
