//! Resource kit: controllers declare their routes as data, a binder mounts them on axum,
//! and a generic CRUD controller serves any schema-described entity with soft delete.

pub mod app;
pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod store;

pub use app::with_http_layers;
pub use config::{init_tracing, ServerConfig};
pub use error::{ApiError, ConfigError, RepositoryError, ServiceError};
pub use handlers::{CrudController, DEFAULT_PAGE_SIZE};
pub use response::{MessageBody, Page};
pub use routes::{
    common_routes, common_routes_with_ready, middleware, ApiRequest, Bound, ControllerDescriptor,
    Endpoint, HttpVerb, Middleware, ResourceController, RoleGate, RouteBinder, RouteInfo,
};
pub use schema::{ColumnDescriptor, ColumnKind, Entity, EntityMetadata, EntitySchema};
pub use service::CrudService;
pub use store::{Filter, InMemoryRepository, PgRepository, Repository};
