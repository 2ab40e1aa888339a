//! Demo server: a `/cars` resource on top of resource-kit.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Without `DATABASE_URL` cars live in memory; with it they go to PostgreSQL.

mod car;

use axum::Router;
use car::{Car, CarController, HeaderRoleGate};
use resource_kit::{
    common_routes, common_routes_with_ready, init_tracing, with_http_layers, InMemoryRepository,
    PgRepository, Repository, RouteBinder, ServerConfig,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    init_tracing("resource_kit=info,example_consumer=info,tower_http=info");

    let (repo, common): (Arc<dyn Repository<Car>>, Router) = match config.connect().await? {
        Some(pool) => {
            let repo = PgRepository::<Car>::new(pool.clone(), config.resource_schema.clone());
            repo.ensure_table().await?;
            tracing::info!(schema = %config.resource_schema, "using PostgreSQL repository");
            (Arc::new(repo), common_routes_with_ready(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory repository");
            (Arc::new(InMemoryRepository::<Car>::new()), common_routes())
        }
    };

    let bound = RouteBinder::new()
        .role_gate(HeaderRoleGate)
        .controller_with(move || CarController::new(repo))
        .bind(common)?;
    tracing::info!(routes = bound.routes.len(), "controllers bound");

    let app = with_http_layers(bound.router, config.body_limit_bytes);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let repo: Arc<dyn Repository<Car>> = Arc::new(InMemoryRepository::<Car>::new());
        RouteBinder::new()
            .role_gate(HeaderRoleGate)
            .controller_with(move || CarController::new(repo))
            .bind(common_routes())
            .unwrap()
            .router
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn stats(role: Option<&str>) -> Request<Body> {
        let mut b = Request::get("/cars/stats");
        if let Some(role) = role {
            b = b.header("x-role", role);
        }
        b.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn stats_requires_admin() {
        let app = app();
        assert_eq!(call(&app, stats(None)).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(call(&app, stats(Some("user"))).await.0, StatusCode::FORBIDDEN);

        let create = Request::post("/cars")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"model": "Toyota", "wheels": 4, "releaseDate": "2021-01-01"}).to_string(),
            ))
            .unwrap();
        assert_eq!(call(&app, create).await.0, StatusCode::CREATED);

        let (status, body) = call(&app, stats(Some("admin"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"total": 1, "byWheels": {"4": 1}}));
    }

    #[tokio::test]
    async fn crud_routes_need_no_role() {
        let app = app();
        let req = Request::get("/cars/1").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Entity not found");
        let req = Request::get("/health").body(Body::empty()).unwrap();
        assert_eq!(call(&app, req).await.0, StatusCode::OK);
    }
}
