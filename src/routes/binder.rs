//! Route binder: turns controller descriptors into axum routes.
//!
//! Every controller is resolved and every descriptor checked before the first route is
//! registered, so a misdeclared controller fails startup as a whole. Each route runs
//! global middlewares, then the controller's, then the role gate (when the endpoint
//! carries a role), then the endpoint's own, then the handler bound to the instance.

use crate::error::ConfigError;
use crate::routes::controller::{ControllerDescriptor, ResourceController};
use crate::routes::endpoint::{join_path, middleware, HttpVerb, Middleware};
use crate::routes::request::ApiRequest;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{RawPathParams, Request};
use axum::http::{request::Parts, Extensions, HeaderMap, Method, Uri};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodRouter};
use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;

/// External authorization gate consulted for endpoints that declare a minimal role.
#[async_trait]
pub trait RoleGate: Send + Sync + 'static {
    /// `Ok` lets the request through; `Err` is sent to the client as is.
    async fn admit(&self, minimal_role: &str, parts: &mut Parts) -> Result<(), Response>;
}

/// One registered route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub verb: HttpVerb,
    pub path: String,
    pub minimal_role: Option<String>,
    pub handler: &'static str,
}

/// Result of a successful bind.
pub struct Bound {
    pub router: Router,
    pub routes: Vec<RouteInfo>,
}

trait BindableController: Send {
    fn name(&self) -> &'static str;
    fn base_path(&self) -> &str;
    fn routes(&self) -> Vec<RouteInfo>;
    fn register(self: Box<Self>, router: Router, ctx: &BindContext) -> Router;
}

struct BindContext {
    global: Vec<Middleware>,
    role_gate: Option<Arc<dyn RoleGate>>,
}

struct Resolved<C: ResourceController> {
    instance: Arc<C>,
    descriptor: ControllerDescriptor<C>,
}

impl<C: ResourceController> BindableController for Resolved<C> {
    fn name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn base_path(&self) -> &str {
        self.descriptor.base_path()
    }

    fn routes(&self) -> Vec<RouteInfo> {
        self.descriptor
            .endpoints()
            .iter()
            .map(|e| RouteInfo {
                verb: e.verb,
                path: join_path(self.descriptor.base_path(), &e.path_suffix),
                minimal_role: self.descriptor.role_of(e).map(str::to_string),
                handler: e.handler_name,
            })
            .collect()
    }

    fn register(self: Box<Self>, mut router: Router, ctx: &BindContext) -> Router {
        let Resolved {
            instance,
            descriptor,
        } = *self;
        for endpoint in descriptor.endpoints() {
            let path = join_path(descriptor.base_path(), &endpoint.path_suffix);

            let mut chain: Vec<Middleware> = ctx.global.clone();
            chain.extend(descriptor.middlewares().iter().cloned());
            if let (Some(role), Some(gate)) = (descriptor.role_of(endpoint), &ctx.role_gate) {
                chain.push(role_gate_middleware(gate.clone(), role.to_string()));
            }
            chain.extend(endpoint.middlewares.iter().cloned());

            let handler = endpoint.handler.clone();
            let instance = instance.clone();
            let route_handler = move |method: Method,
                                      uri: Uri,
                                      headers: HeaderMap,
                                      extensions: Extensions,
                                      params: Option<RawPathParams>,
                                      body: Bytes| {
                let handler = handler.clone();
                let instance = instance.clone();
                async move {
                    match ApiRequest::from_parts(method, uri, headers, extensions, params, body) {
                        Ok(request) => handler(instance, request).await,
                        Err(e) => e.into_response(),
                    }
                }
            };

            let mut method_router: MethodRouter = on(endpoint.verb.method_filter(), route_handler);
            // Last layer added runs first.
            for mw in chain.into_iter().rev() {
                method_router = method_router.layer(from_fn(move |req: Request, next: Next| {
                    let mw = mw.clone();
                    async move { mw(req, next).await }
                }));
            }

            tracing::info!(
                verb = %endpoint.verb,
                path = %path,
                handler = endpoint.handler_name,
                "registered route"
            );
            router = router.route(&path, method_router);
        }
        router
    }
}

fn role_gate_middleware(gate: Arc<dyn RoleGate>, role: String) -> Middleware {
    middleware(move |req: Request, next: Next| {
        let gate = gate.clone();
        let role = role.clone();
        async move {
            let (mut parts, body) = req.into_parts();
            if let Err(denied) = gate.admit(&role, &mut parts).await {
                return denied;
            }
            next.run(Request::from_parts(parts, body)).await
        }
    })
}

type Factory = Box<dyn FnOnce() -> Box<dyn BindableController> + Send>;

/// Collects controllers, then binds them all at once.
#[derive(Default)]
pub struct RouteBinder {
    factories: Vec<Factory>,
    global: Vec<Middleware>,
    role_gate: Option<Arc<dyn RoleGate>>,
}

impl RouteBinder {
    pub fn new() -> Self {
        RouteBinder::default()
    }

    /// Middleware run first on every bound route.
    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.global.push(mw);
        self
    }

    pub fn role_gate(mut self, gate: impl RoleGate) -> Self {
        self.role_gate = Some(Arc::new(gate));
        self
    }

    /// Bind an already constructed controller.
    pub fn controller<C: ResourceController>(self, instance: Arc<C>) -> Self {
        self.controller_lazy(move || instance)
    }

    /// Bind the controller produced by `factory`, called once during [`RouteBinder::bind`].
    pub fn controller_with<C, F>(self, factory: F) -> Self
    where
        C: ResourceController,
        F: FnOnce() -> C + Send + 'static,
    {
        self.controller_lazy(move || Arc::new(factory()))
    }

    fn controller_lazy<C, F>(mut self, factory: F) -> Self
    where
        C: ResourceController,
        F: FnOnce() -> Arc<C> + Send + 'static,
    {
        self.factories.push(Box::new(move || {
            let instance = factory();
            let descriptor = instance.descriptor();
            Box::new(Resolved { instance, descriptor }) as Box<dyn BindableController>
        }));
        self
    }

    /// Register every collected controller on `router`, in declaration order.
    pub fn bind(self, router: Router) -> Result<Bound, ConfigError> {
        let RouteBinder {
            factories,
            global,
            role_gate,
        } = self;
        let controllers: Vec<Box<dyn BindableController>> = factories.into_iter().map(|f| f()).collect();

        let mut routes = Vec::new();
        let mut seen = HashSet::new();
        for c in &controllers {
            if c.base_path().trim().is_empty() {
                return Err(ConfigError::MissingBasePath { controller: c.name() });
            }
            for route in c.routes() {
                if !seen.insert((route.verb, route_shape(&route.path))) {
                    return Err(ConfigError::DuplicateRoute {
                        verb: route.verb,
                        path: route.path,
                    });
                }
                if let (Some(role), None) = (&route.minimal_role, &role_gate) {
                    return Err(ConfigError::MissingRoleGate {
                        verb: route.verb,
                        path: route.path,
                        role: role.clone(),
                    });
                }
                routes.push(route);
            }
        }

        let ctx = BindContext { global, role_gate };
        let router = controllers
            .into_iter()
            .fold(router, |router, c| c.register(router, &ctx));
        Ok(Bound { router, routes })
    }
}

/// Path with parameter names erased: `/cars/:id` and `/cars/:key` match the same requests.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response;
    use crate::routes::endpoint::Endpoint;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Greeter {
        greeting: String,
        calls: AtomicUsize,
    }

    impl Greeter {
        fn new(greeting: &str) -> Self {
            Greeter {
                greeting: greeting.into(),
                calls: AtomicUsize::new(0),
            }
        }

        async fn greet(self: Arc<Self>, req: ApiRequest) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = req.path_param("name").unwrap_or("nobody");
            response::ok(serde_json::json!({ "message": format!("{} {}", self.greeting, name) }))
        }

        async fn trace(self: Arc<Self>, req: ApiRequest) -> Response {
            let trail = req
                .headers
                .get_all("x-trail")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(",");
            response::ok(serde_json::json!({ "trail": trail }))
        }
    }

    impl ResourceController for Greeter {
        fn descriptor(&self) -> ControllerDescriptor<Self> {
            ControllerDescriptor::new("/greet")
                .middleware(trail("class"))
                .get("/:name", Self::greet)
                .endpoint(Endpoint::get("/trace/chain", Self::trace).middleware(trail("endpoint")))
                .endpoint(Endpoint::get("/admin/secret", Self::greet).minimal_role("admin"))
        }
    }

    struct NoBase;

    impl ResourceController for NoBase {
        fn descriptor(&self) -> ControllerDescriptor<Self> {
            ControllerDescriptor::new("  ")
        }
    }

    struct ByParam(&'static str);

    impl ByParam {
        async fn find(self: Arc<Self>, _req: ApiRequest) -> Response {
            response::no_content()
        }
    }

    impl ResourceController for ByParam {
        fn descriptor(&self) -> ControllerDescriptor<Self> {
            ControllerDescriptor::new("/items").get(format!("/:{}", self.0), Self::find)
        }
    }

    fn trail(tag: &'static str) -> Middleware {
        middleware(move |mut req: Request, next: Next| async move {
            req.headers_mut().append("x-trail", HeaderValue::from_static(tag));
            next.run(req).await
        })
    }

    struct HeaderGate;

    #[async_trait]
    impl RoleGate for HeaderGate {
        async fn admit(&self, minimal_role: &str, parts: &mut Parts) -> Result<(), Response> {
            let role = parts.headers.get("x-role").and_then(|v| v.to_str().ok());
            if role == Some(minimal_role) {
                parts.headers.append("x-trail", HeaderValue::from_static("gate"));
                Ok(())
            } else {
                Err(StatusCode::FORBIDDEN.into_response())
            }
        }
    }

    async fn call(router: &Router, uri: &str, role: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(role) = role {
            builder = builder.header("x-role", role);
        }
        let resp = router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn binds_handlers_to_the_resolved_instance() {
        let greeter = Arc::new(Greeter::new("hello"));
        let bound = RouteBinder::new()
            .role_gate(HeaderGate)
            .controller(greeter.clone())
            .bind(Router::new())
            .unwrap();
        let (status, body) = call(&bound.router, "/greet/ada", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "hello ada");
        assert_eq!(greeter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reports_routes_with_full_paths() {
        let bound = RouteBinder::new()
            .role_gate(HeaderGate)
            .controller_with(|| Greeter::new("hi"))
            .bind(Router::new())
            .unwrap();
        let paths: Vec<_> = bound.routes.iter().map(|r| (r.verb, r.path.as_str())).collect();
        assert_eq!(
            paths,
            [
                (HttpVerb::Get, "/greet/:name"),
                (HttpVerb::Get, "/greet/trace/chain"),
                (HttpVerb::Get, "/greet/admin/secret"),
            ]
        );
        assert_eq!(bound.routes[2].minimal_role.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn middlewares_run_global_then_class_then_endpoint() {
        let bound = RouteBinder::new()
            .middleware(trail("global"))
            .role_gate(HeaderGate)
            .controller_with(|| Greeter::new("hi"))
            .bind(Router::new())
            .unwrap();
        let (_, body) = call(&bound.router, "/greet/trace/chain", None).await;
        assert_eq!(body["trail"], "global,class,endpoint");
    }

    #[tokio::test]
    async fn role_gate_guards_only_endpoints_with_a_role() {
        let bound = RouteBinder::new()
            .role_gate(HeaderGate)
            .controller_with(|| Greeter::new("hi"))
            .bind(Router::new())
            .unwrap();
        let (status, _) = call(&bound.router, "/greet/admin/secret", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&bound.router, "/greet/admin/secret", Some("admin")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&bound.router, "/greet/bob", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn missing_base_path_fails_before_registration() {
        let err = RouteBinder::new()
            .role_gate(HeaderGate)
            .controller_with(|| Greeter::new("hi"))
            .controller_with(|| NoBase)
            .bind(Router::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingBasePath { controller } if controller.ends_with("NoBase")));
    }

    #[test]
    fn role_without_gate_is_a_config_error() {
        let err = RouteBinder::new()
            .controller_with(|| Greeter::new("hi"))
            .bind(Router::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingRoleGate { ref role, .. } if role == "admin"));
    }

    #[test]
    fn same_route_from_two_controllers_is_rejected() {
        let err = RouteBinder::new()
            .role_gate(HeaderGate)
            .controller_with(|| Greeter::new("hi"))
            .controller_with(|| Greeter::new("hey"))
            .bind(Router::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DuplicateRoute { verb: HttpVerb::Get, ref path } if path == "/greet/:name"));
    }

    #[test]
    fn routes_differing_only_in_parameter_name_are_rejected() {
        let err = RouteBinder::new()
            .controller_with(|| ByParam("id"))
            .controller_with(|| ByParam("key"))
            .bind(Router::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DuplicateRoute { verb: HttpVerb::Get, ref path } if path == "/items/:key"));
    }

    #[test]
    fn route_shape_erases_parameter_names() {
        assert_eq!(route_shape("/cars/:id"), route_shape("/cars/:key"));
        assert_eq!(route_shape("/files/*rest"), "/files/*");
        assert_ne!(route_shape("/cars/:id"), route_shape("/cars/stats"));
    }
}
