//! Endpoint metadata: one HTTP operation of a resource controller.

use crate::routes::request::ApiRequest;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::MethodFilter;
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub(crate) fn method_filter(self) -> MethodFilter {
        match self {
            HttpVerb::Get => MethodFilter::GET,
            HttpVerb::Post => MethodFilter::POST,
            HttpVerb::Put => MethodFilter::PUT,
            HttpVerb::Patch => MethodFilter::PATCH,
            HttpVerb::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request interceptor. Runs before the handler and decides whether to call `next`.
pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async function as a [`Middleware`].
pub fn middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req, next| f(req, next).boxed())
}

/// Handler bound to a controller instance at call time.
pub type Handler<C> = Arc<dyn Fn(Arc<C>, ApiRequest) -> BoxFuture<'static, Response> + Send + Sync>;

pub struct Endpoint<C> {
    pub verb: HttpVerb,
    pub path_suffix: String,
    pub handler: Handler<C>,
    /// Type name of the declared handler, for logs.
    pub handler_name: &'static str,
    pub minimal_role: Option<String>,
    pub middlewares: Vec<Middleware>,
}

impl<C> Clone for Endpoint<C> {
    fn clone(&self) -> Self {
        Endpoint {
            verb: self.verb,
            path_suffix: self.path_suffix.clone(),
            handler: self.handler.clone(),
            handler_name: self.handler_name,
            minimal_role: self.minimal_role.clone(),
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<C> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("verb", &self.verb)
            .field("path_suffix", &self.path_suffix)
            .field("handler", &self.handler_name)
            .field("minimal_role", &self.minimal_role)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl<C: Send + Sync + 'static> Endpoint<C> {
    pub fn new<F, Fut>(verb: HttpVerb, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Endpoint {
            verb,
            path_suffix: path_suffix.into(),
            handler: Arc::new(move |c, req| handler(c, req).boxed()),
            handler_name: std::any::type_name::<F>(),
            minimal_role: None,
            middlewares: Vec::new(),
        }
    }

    pub fn get<F, Fut>(path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(HttpVerb::Get, path_suffix, handler)
    }

    pub fn post<F, Fut>(path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(HttpVerb::Post, path_suffix, handler)
    }

    pub fn put<F, Fut>(path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(HttpVerb::Put, path_suffix, handler)
    }

    pub fn patch<F, Fut>(path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(HttpVerb::Patch, path_suffix, handler)
    }

    pub fn delete<F, Fut>(path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(HttpVerb::Delete, path_suffix, handler)
    }

    /// Role token relayed to the role gate. Not interpreted here.
    pub fn minimal_role(mut self, role: impl Into<String>) -> Self {
        self.minimal_role = Some(role.into());
        self
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    /// Same endpoint, invoked on a `D` resolved from the owning controller.
    pub(crate) fn project<D, P>(self, project: P) -> Endpoint<D>
    where
        D: Send + Sync + 'static,
        P: Fn(&D) -> Arc<C> + Send + Sync + 'static,
    {
        let handler = self.handler;
        Endpoint {
            verb: self.verb,
            path_suffix: self.path_suffix,
            handler: Arc::new(move |d: Arc<D>, req| handler(project(&d), req)),
            handler_name: self.handler_name,
            minimal_role: self.minimal_role,
            middlewares: self.middlewares,
        }
    }

    /// Whether both declare the same verb and (normalised) path suffix.
    pub(crate) fn same_route(&self, other: &Endpoint<C>) -> bool {
        self.verb == other.verb && normalize_suffix(&self.path_suffix) == normalize_suffix(&other.path_suffix)
    }
}

fn normalize_suffix(suffix: &str) -> &str {
    suffix.trim().trim_matches('/')
}

/// Full route path: base path followed by the endpoint suffix. `""` and `"/"` add nothing.
pub fn join_path(base_path: &str, suffix: &str) -> String {
    let base = base_path.trim().trim_matches('/');
    let suffix = suffix.trim().trim_matches('/');
    let mut path = String::with_capacity(base.len() + suffix.len() + 2);
    path.push('/');
    path.push_str(base);
    if !suffix.is_empty() {
        if !base.is_empty() {
            path.push('/');
        }
        path.push_str(suffix);
    }
    path
}
