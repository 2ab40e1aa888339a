//! Generic CRUD controller: maps the six resource routes onto [`CrudService`].

use crate::error::ApiError;
use crate::response;
use crate::routes::{ApiRequest, ControllerDescriptor, ResourceController};
use crate::schema::{from_object, Entity, EntitySchema, CREATED_AT, DELETED_AT, ID, UPDATED_AT};
use crate::service::{BodyMode, CrudService, RequestValidator};
use crate::store::{Filter, Repository};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

const PAGE: &str = "page";
const PAGE_SIZE: &str = "pageSize";

/// Search, consult, create, update, patch and delete for one entity type under `base_path`.
pub struct CrudController<T: Entity> {
    service: CrudService<T>,
    base_path: String,
    default_page_size: u64,
}

impl<T: Entity> CrudController<T> {
    pub fn new(base_path: impl Into<String>, repo: Arc<dyn Repository<T>>) -> Self {
        Self::with_service(base_path, CrudService::new(repo))
    }

    pub fn with_service(base_path: impl Into<String>, service: CrudService<T>) -> Self {
        CrudController {
            service,
            base_path: base_path.into(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: u64) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    pub fn service(&self) -> &CrudService<T> {
        &self.service
    }

    fn schema(&self) -> &EntitySchema {
        self.service.schema()
    }

    /// `GET {base}`: 200 with a page, 204 when nothing matches.
    pub async fn search(self: Arc<Self>, req: ApiRequest) -> Response {
        let page = positive(req.query_value(PAGE)).unwrap_or(1);
        let page_size = positive(req.query_value(PAGE_SIZE)).unwrap_or(self.default_page_size);
        let Some(criteria) = self.criteria(&req.query) else {
            return response::no_content();
        };
        match self.service.search(criteria, page, page_size).await {
            Ok(Some(page)) => response::ok(page),
            Ok(None) => response::no_content(),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    /// `GET {base}/:id`
    pub async fn consult(self: Arc<Self>, req: ApiRequest) -> Response {
        let result: Result<_, ApiError> = async {
            let id = path_id(&req)?;
            self.service.consult(id).await?.ok_or(ApiError::NotFound)
        }
        .await;
        match result {
            Ok(entity) => response::ok(entity),
            Err(e) => e.into_response(),
        }
    }

    /// `POST {base}`: 201 with the stored entity.
    pub async fn create(self: Arc<Self>, req: ApiRequest) -> Response {
        let result: Result<_, ApiError> = async {
            let body = req.body.unwrap_or_else(empty_object);
            let object = RequestValidator::validate(self.schema(), BodyMode::Create, &body)?;
            let entity: T = decode(object)?;
            Ok(self.service.create(entity).await?)
        }
        .await;
        match result {
            Ok(entity) => response::created(entity),
            Err(e) => e.into_response(),
        }
    }

    /// `PUT {base}/:id`: the body must carry the path id.
    pub async fn update(self: Arc<Self>, req: ApiRequest) -> Response {
        let result: Result<_, ApiError> = async {
            let id = path_id(&req)?;
            let body = req.body.unwrap_or_else(empty_object);
            if body.get(ID).and_then(Value::as_i64) != Some(id) {
                return Err(ApiError::IdMismatch);
            }
            let object = RequestValidator::validate(self.schema(), BodyMode::Replace, &body)?;
            let entity: T = decode(object)?;
            Ok(self.service.update(id, entity).await?)
        }
        .await;
        match result {
            Ok(entity) => response::ok(entity),
            Err(e) => e.into_response(),
        }
    }

    /// `PATCH {base}/:id`: only the supplied fields change.
    pub async fn patch(self: Arc<Self>, req: ApiRequest) -> Response {
        let result: Result<_, ApiError> = async {
            let id = path_id(&req)?;
            let body = req.body.unwrap_or_else(empty_object);
            let object = RequestValidator::validate(self.schema(), BodyMode::Patch, &body)?;
            Ok(self.service.patch(id, object.clone()).await?)
        }
        .await;
        match result {
            Ok(entity) => response::ok(entity),
            Err(e) => e.into_response(),
        }
    }

    /// `DELETE {base}/:id`: soft delete, 204.
    pub async fn delete(self: Arc<Self>, req: ApiRequest) -> Response {
        let result: Result<_, ApiError> = async {
            let id = path_id(&req)?;
            Ok(self.service.delete(id).await?)
        }
        .await;
        match result {
            Ok(()) => response::no_content(),
            Err(e) => e.into_response(),
        }
    }

    /// Exact-match criteria from the query string. Paging keys and unknown properties are dropped.
    /// `None` when a value cannot be held by its column, so nothing can match.
    fn criteria(&self, query: &[(String, String)]) -> Option<Filter> {
        let schema = self.schema();
        let mut filter = Filter::new();
        for (key, raw) in query {
            if key == PAGE || key == PAGE_SIZE {
                continue;
            }
            let Some(column) = schema.column(key) else {
                tracing::debug!(param = %key, "ignoring unknown query parameter");
                continue;
            };
            match column.kind.coerce(raw) {
                Some(value) => filter.push(key.as_str(), value),
                None => {
                    tracing::debug!(param = %key, value = %raw, "query value does not fit its column");
                    return None;
                }
            }
        }
        Some(filter)
    }
}

impl<T: Entity> ResourceController for CrudController<T> {
    fn descriptor(&self) -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(self.base_path.clone())
            .get("", Self::search)
            .get("/:id", Self::consult)
            .post("", Self::create)
            .put("/:id", Self::update)
            .patch("/:id", Self::patch)
            .delete("/:id", Self::delete)
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|&n| n >= 1)
}

fn path_id(req: &ApiRequest) -> Result<i64, ApiError> {
    req.path_param(ID)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ApiError::InvalidIdentifier)
}

/// Entity from a validated body. Client timestamps are dropped; the service sets them.
fn decode<T: Entity>(object: &Map<String, Value>) -> Result<T, ApiError> {
    let mut object = object.clone();
    for key in [CREATED_AT, UPDATED_AT, DELETED_AT] {
        object.remove(key);
    }
    from_object(object).map_err(|e| ApiError::InvalidBody(vec![e.to_string()]))
}
