//! Route declaration: a controller describes its base path and endpoints as plain data.

use crate::routes::endpoint::{Endpoint, Middleware};
use crate::routes::request::ApiRequest;
use axum::response::Response;
use std::future::Future;
use std::sync::Arc;

/// A type whose instances expose HTTP endpoints. The binder reads the descriptor once,
/// at startup; declaring routes performs no I/O.
pub trait ResourceController: Send + Sync + Sized + 'static {
    fn descriptor(&self) -> ControllerDescriptor<Self>;
}

/// Base path, class-level middlewares and ordered endpoints of one controller.
pub struct ControllerDescriptor<C> {
    base_path: String,
    endpoints: Vec<Endpoint<C>>,
    middlewares: Vec<Middleware>,
    minimal_role: Option<String>,
}

impl<C: Send + Sync + 'static> ControllerDescriptor<C> {
    pub fn new(base_path: impl Into<String>) -> Self {
        ControllerDescriptor {
            base_path: base_path.into(),
            endpoints: Vec::new(),
            middlewares: Vec::new(),
            minimal_role: None,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn endpoints(&self) -> &[Endpoint<C>] {
        &self.endpoints
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Role applied to endpoints that declare none of their own.
    pub fn class_minimal_role(&self) -> Option<&str> {
        self.minimal_role.as_deref()
    }

    /// Effective role of an endpoint.
    pub fn role_of<'a>(&'a self, endpoint: &'a Endpoint<C>) -> Option<&'a str> {
        endpoint.minimal_role.as_deref().or(self.class_minimal_role())
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    pub fn minimal_role(mut self, role: impl Into<String>) -> Self {
        self.minimal_role = Some(role.into());
        self
    }

    /// Append an endpoint. Re-declaring a verb and path suffix replaces the earlier
    /// declaration in place.
    pub fn endpoint(mut self, endpoint: Endpoint<C>) -> Self {
        if let Some(existing) = self.endpoints.iter_mut().find(|e| e.same_route(&endpoint)) {
            tracing::warn!(
                verb = %endpoint.verb,
                base_path = %self.base_path,
                suffix = %endpoint.path_suffix,
                "endpoint declared twice; keeping the last declaration"
            );
            *existing = endpoint;
        } else {
            self.endpoints.push(endpoint);
        }
        self
    }

    pub fn get<F, Fut>(self, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(Endpoint::get(path_suffix, handler))
    }

    pub fn post<F, Fut>(self, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(Endpoint::post(path_suffix, handler))
    }

    pub fn put<F, Fut>(self, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(Endpoint::put(path_suffix, handler))
    }

    pub fn patch<F, Fut>(self, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(Endpoint::patch(path_suffix, handler))
    }

    pub fn delete<F, Fut>(self, path_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.endpoint(Endpoint::delete(path_suffix, handler))
    }

    /// Adopt the endpoints of an embedded controller `D`, reached through `project`.
    /// Its class middlewares run before each adopted endpoint's own; its class role
    /// becomes the role of adopted endpoints that have none.
    pub fn include<D, P>(mut self, other: ControllerDescriptor<D>, project: P) -> Self
    where
        D: Send + Sync + 'static,
        P: Fn(&C) -> Arc<D> + Clone + Send + Sync + 'static,
    {
        let ControllerDescriptor {
            endpoints,
            middlewares,
            minimal_role,
            ..
        } = other;
        for mut endpoint in endpoints {
            let mut chain = middlewares.clone();
            chain.append(&mut endpoint.middlewares);
            endpoint.middlewares = chain;
            if endpoint.minimal_role.is_none() {
                endpoint.minimal_role = minimal_role.clone();
            }
            self = self.endpoint(endpoint.project(project.clone()));
        }
        self
    }
}
