//! The demo resource: cars, with an admin-only statistics endpoint.

use async_trait::async_trait;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use resource_kit::response::{self, MessageBody};
use resource_kit::{
    ApiError, ApiRequest, ColumnDescriptor, ColumnKind, ControllerDescriptor, CrudController,
    Endpoint, Entity, EntityMetadata, EntitySchema, Filter, Repository, ResourceController, RoleGate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(flatten)]
    pub meta: EntityMetadata,
    pub model: String,
    pub wheels: i32,
    pub release_date: NaiveDate,
}

impl Entity for Car {
    fn schema() -> EntitySchema {
        EntitySchema::new(
            "cars",
            vec![
                ColumnDescriptor::required("model", ColumnKind::Text),
                ColumnDescriptor::required("wheels", ColumnKind::Int),
                ColumnDescriptor::required("releaseDate", ColumnKind::Date),
            ],
        )
    }

    fn meta(&self) -> &EntityMetadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMetadata {
        &mut self.meta
    }
}

/// Stats are computed over at most this many cars.
const STATS_SCAN_LIMIT: u64 = 1000;

/// The generic CRUD routes for cars plus `GET /cars/stats`.
pub struct CarController {
    crud: Arc<CrudController<Car>>,
}

impl CarController {
    pub fn new(repo: Arc<dyn Repository<Car>>) -> Self {
        CarController {
            crud: Arc::new(CrudController::new("/cars", repo)),
        }
    }

    async fn stats(self: Arc<Self>, _req: ApiRequest) -> Response {
        let page = match self.crud.service().search(Filter::new(), 1, STATS_SCAN_LIMIT).await {
            Ok(page) => page,
            Err(e) => return ApiError::from(e).into_response(),
        };
        let mut by_wheels: BTreeMap<i32, u64> = BTreeMap::new();
        let total = page.as_ref().map_or(0, |p| p.total);
        for car in page.iter().flat_map(|p| &p.data) {
            *by_wheels.entry(car.wheels).or_default() += 1;
        }
        response::ok(serde_json::json!({ "total": total, "byWheels": by_wheels }))
    }
}

impl ResourceController for CarController {
    fn descriptor(&self) -> ControllerDescriptor<Self> {
        ControllerDescriptor::new("/cars")
            .endpoint(Endpoint::get("/stats", Self::stats).minimal_role("admin"))
            .include(self.crud.descriptor(), |c: &CarController| c.crud.clone())
    }
}

const ROLES: [&str; 2] = ["user", "admin"];

/// Demo gate: the caller's role comes from the `x-role` header; `admin` outranks `user`.
pub struct HeaderRoleGate;

#[async_trait]
impl RoleGate for HeaderRoleGate {
    async fn admit(&self, minimal_role: &str, parts: &mut Parts) -> Result<(), Response> {
        let rank = |role: &str| ROLES.iter().position(|r| *r == role);
        let Some(role) = parts.headers.get("x-role").and_then(|v| v.to_str().ok()) else {
            return Err(deny(StatusCode::UNAUTHORIZED, "Missing role"));
        };
        match (rank(role), rank(minimal_role)) {
            (Some(have), Some(need)) if have >= need => Ok(()),
            _ => {
                tracing::debug!(role, minimal_role, "role gate refused request");
                Err(deny(StatusCode::FORBIDDEN, "Insufficient role"))
            }
        }
    }
}

fn deny(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageBody {
            message: message.into(),
        }),
    )
        .into_response()
}
