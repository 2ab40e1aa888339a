pub mod binder;
pub mod common;
pub mod controller;
pub mod endpoint;
pub mod request;

pub use binder::{Bound, RoleGate, RouteBinder, RouteInfo};
pub use common::{common_routes, common_routes_with_ready};
pub use controller::{ControllerDescriptor, ResourceController};
pub use endpoint::{join_path, middleware, Endpoint, Handler, HttpVerb, Middleware};
pub use request::ApiRequest;
