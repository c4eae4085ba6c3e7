//! HTTP API.
//!
//! Public routes serve the status page; operator routes sit behind
//! [`auth::require_operator`]. Every response carries the security headers
//! below and a request id.

pub mod auth;
pub mod components;
pub mod health;
pub mod incidents;
pub mod maintenance;
pub mod metrics;
pub mod overview;
pub mod state;
pub mod subscriptions;

use axum::{
    http::{header, HeaderName, HeaderValue},
    middleware, Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; connect-src 'self'; \
     font-src 'self' https: data:; object-src 'none'; media-src 'none'; frame-src 'none'";

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(overview::public_router())
        .merge(incidents::public_router())
        .merge(maintenance::public_router())
        .merge(subscriptions::public_router())
}

fn operator_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(overview::operator_router())
        .merge(components::operator_router())
        .merge(incidents::operator_router())
        .merge(maintenance::operator_router())
        .merge(subscriptions::operator_router())
        .merge(metrics::operator_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_operator,
        ))
}

fn security_headers(router: Router) -> Router {
    let headers = [
        (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains; preload",
        ),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
    ];
    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

/// Builds the full application router with state and middleware applied.
pub fn router(state: AppState) -> Router {
    let app = public_routes()
        .merge(operator_routes(&state))
        .with_state(state);

    security_headers(app)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::test_pool;
    use crate::notify::Notifier;
    use crate::seed::seed_if_empty;

    const TOKEN: &str = "operator-token";

    fn app_with(token: Option<&str>, max_subscriptions: u64) -> (tempfile::TempDir, Router, AppState) {
        let (dir, pool) = test_pool();
        seed_if_empty(&pool, "Methods").unwrap();
        let config = Config {
            bind: "127.0.0.1:0".parse().unwrap(),
            db_path: dir.path().join("test.sqlite"),
            operator_token: token.map(String::from),
            methods_component: "Methods".to_string(),
            poll_interval: Duration::from_secs(30),
            seed: true,
            webhook_timeout: Duration::from_secs(1),
            max_subscriptions,
        };
        let state = AppState::new(pool, config, Notifier::new(Duration::from_secs(1)).unwrap());
        (dir, router(state.clone()), state)
    }

    fn app() -> (tempfile::TempDir, Router, AppState) {
        app_with(Some(TOKEN), 100)
    }

    fn request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn component_id(app: &Router, name: &str) -> String {
        let (_, components) = send(app, request("GET", "/api/components", None, Some(TOKEN))).await;
        components
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == name)
            .map(|c| c["id"].as_str().unwrap().to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, app, _) = app();
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn overview_is_public_and_cached() {
        let (_dir, app, _) = app();
        let resp = app
            .clone()
            .oneshot(request("GET", "/api/overview", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "public, max-age=30");
        assert_eq!(resp.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(resp.headers().contains_key("x-request-id"));

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["overallStatus"], "operational");
        assert_eq!(body["statusText"], "All Systems Operational");
        assert_eq!(body["components"].as_array().unwrap().len(), 4);
        assert_eq!(body["methods"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn operator_routes_require_token() {
        let (_dir, app, _) = app();
        let (status, body) = send(&app, request("GET", "/api/components", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (status, _) = send(&app, request("GET", "/api/components", None, Some("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, request("GET", "/api/dashboard", None, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn operator_routes_closed_without_configured_token() {
        let (_dir, app, _) = app_with(None, 100);
        let (status, _) = send(&app, request("GET", "/api/components", None, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, request("GET", "/api/incidents", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn component_status_drives_overall_status() {
        let (_dir, app, _) = app();
        let db = component_id(&app, "Database").await;
        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/api/components/{db}/status"),
                Some(json!({ "status": "outage" })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "outage");

        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        assert_eq!(overview["overallStatus"], "outage");
        assert_eq!(overview["statusText"], "Major System Outage");

        send(
            &app,
            request(
                "PUT",
                &format!("/api/components/{db}/visibility"),
                Some(json!({ "visible": false })),
                Some(TOKEN),
            ),
        )
        .await;
        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        assert_eq!(overview["overallStatus"], "operational");
        let (_, dashboard) = send(&app, request("GET", "/api/dashboard", None, Some(TOKEN))).await;
        assert_eq!(dashboard["overallStatus"], "outage");
    }

    #[tokio::test]
    async fn incident_lifecycle_updates_method_status() {
        let (_dir, app, _) = app();
        let methods = component_id(&app, "Methods").await;

        let (status, incident) = send(
            &app,
            request(
                "POST",
                "/api/incidents",
                Some(json!({
                    "title": "Payins failing in Brazil",
                    "affectedComponents": [{ "componentId": methods, "status": "outage" }],
                    "methodsAffected": [{ "type": "payin", "countryCode": "br" }],
                    "message": "We are investigating."
                })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(incident["status"], "investigating");
        let id = incident["id"].as_str().unwrap().to_string();

        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        let payin = overview["methods"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["type"] == "payin")
            .unwrap()
            .clone();
        assert_eq!(payin["status"], "outage");
        let br = payin["countries"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["countryCode"] == "BR")
            .unwrap()
            .clone();
        assert_eq!(br["status"], "outage");

        let (status, resolved) = send(
            &app,
            request(
                "POST",
                &format!("/api/incidents/{id}/updates"),
                Some(json!({ "message": "Fixed.", "status": "resolved" })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resolved["status"], "resolved");
        assert_eq!(resolved["updates"][0]["message"], "Fixed.");

        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        for method in overview["methods"].as_array().unwrap() {
            assert_eq!(method["status"], "operational");
        }

        let (status, _) = send(&app, request("GET", &format!("/api/incidents/{id}"), None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            request("DELETE", &format!("/api/incidents/{id}"), None, Some(TOKEN)),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, request("GET", &format!("/api/incidents/{id}"), None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let (_dir, app, _) = app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/subscriptions",
                Some(json!({ "type": "webhook", "webhookUrl": "ftp://nope" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/subscriptions",
                Some(json!({ "type": "email", "email": "ops@example.com" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, subs) = send(&app, request("GET", "/api/subscriptions", None, Some(TOKEN))).await;
        assert_eq!(subs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn public_signup_rejects_internal_webhook_targets() {
        let (_dir, app, _) = app();
        for url in [
            "http://127.0.0.1:6379/",
            "http://169.254.169.254/latest/meta-data/",
            "http://localhost/hook",
            "http://",
        ] {
            let (status, body) = send(
                &app,
                request(
                    "POST",
                    "/api/subscriptions",
                    Some(json!({ "type": "webhook", "webhookUrl": url })),
                    None,
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
            assert_eq!(body["code"], "validation");
        }

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/subscriptions",
                Some(json!({ "type": "webhook", "webhookUrl": "https://hooks.example.com/status" })),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, subs) = send(&app, request("GET", "/api/subscriptions", None, Some(TOKEN))).await;
        assert_eq!(subs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn public_signup_stops_at_configured_cap() {
        let (_dir, app, _) = app_with(Some(TOKEN), 1);
        let signup = || {
            request(
                "POST",
                "/api/subscriptions",
                Some(json!({ "type": "email", "email": "ops@example.com" })),
                None,
            )
        };
        let (status, _) = send(&app, signup()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, signup()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn public_incident_views_hide_operator_identity() {
        let (_dir, app, _) = app();
        let (status, created) = send(
            &app,
            request(
                "POST",
                "/api/incidents",
                Some(json!({ "title": "API errors", "createdBy": "ops@example.com" })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["createdBy"], "ops@example.com");
        let id = created["id"].as_str().unwrap().to_string();

        let (_, one) = send(&app, request("GET", &format!("/api/incidents/{id}"), None, None)).await;
        assert!(one.get("createdBy").is_none());
        let (_, all) = send(&app, request("GET", "/api/incidents", None, None)).await;
        assert!(all[0].get("createdBy").is_none());
        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        assert!(overview["incidents"][0].get("createdBy").is_none());

        let (_, dashboard) = send(&app, request("GET", "/api/dashboard", None, Some(TOKEN))).await;
        assert_eq!(dashboard["incidents"][0]["createdBy"], "ops@example.com");
    }

    #[tokio::test]
    async fn maintenance_and_metrics_roundtrip() {
        let (_dir, app, _) = app();
        let (status, window) = send(
            &app,
            request(
                "POST",
                "/api/maintenance",
                Some(json!({
                    "title": "Database upgrade",
                    "scheduledStart": "2099-01-01T02:00:00Z",
                    "scheduledEnd": "2099-01-01T04:00:00Z"
                })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(window["status"], "scheduled");

        let (_, overview) = send(&app, request("GET", "/api/overview", None, None)).await;
        assert_eq!(overview["maintenance"].as_array().unwrap().len(), 1);

        let api = component_id(&app, "API").await;
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/metrics",
                Some(json!({ "componentId": api, "name": "latency", "value": 120.5, "unit": "ms" })),
                Some(TOKEN),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, metrics) = send(
            &app,
            request("GET", &format!("/api/metrics?componentId={api}&limit=5"), None, Some(TOKEN)),
        )
        .await;
        assert_eq!(metrics[0]["value"], 120.5);
    }
}
