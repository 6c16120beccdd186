use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::{middleware as axum_middleware, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config;
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::middleware::identity_middleware;

/// Full application router.
pub fn app() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(org_routes())
        .merge(layanan_routes())
        .merge(hattra_routes())
        .layer(axum_middleware::from_fn(identity_middleware))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router {
    Router::new()
        .route("/auth/login", post(public::auth::login))
        .route("/auth/whoami", get(protected::auth::whoami))
}

fn user_routes() -> Router {
    Router::new()
        .route("/users", get(public::users::list).post(public::users::create))
        .route("/users/search", get(protected::users::search))
        .route(
            "/users/:username",
            get(public::users::get)
                .patch(protected::users::update)
                .delete(protected::users::delete),
        )
}

fn org_routes() -> Router {
    use protected::org;

    Router::new()
        .route("/provinsi", get(org::provinsi))
        .route("/kota", get(org::kota))
        .route("/puskesmas", get(org::puskesmas))
        .route("/kestrad", get(org::kestrad))
        .route("/org/:tier/:username", get(org::detail))
}

fn layanan_routes() -> Router {
    use protected::layanan;

    Router::new()
        .route("/layanan", get(layanan::list).post(layanan::create))
        .route("/layanan/search", get(layanan::search))
        .route("/layanan/verifikasi/:id", patch(layanan::verify))
        .route(
            "/layanan/:id",
            get(layanan::get).patch(layanan::update).delete(layanan::delete),
        )
}

fn hattra_routes() -> Router {
    use protected::hattra;

    Router::new()
        .route("/hattra", get(hattra::list).post(hattra::create))
        .route("/hattra/search", get(hattra::search))
        .route("/hattra/byUser/:username", get(hattra::by_user))
        .route("/hattra/byLayanan/:id", get(hattra::by_layanan))
        .route(
            "/hattra/:id",
            get(hattra::get).patch(hattra::update).delete(hattra::delete),
        )
        .route("/hattra/:id/verification", patch(hattra::verify))
        .route("/hattra/:id/verification/unverify", patch(hattra::unverify))
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Hattra API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "endpoints": {
                "auth": "/auth/login (public), /auth/whoami",
                "users": "/users[/:username], /users/search",
                "org": "/provinsi, /kota, /puskesmas, /kestrad, /org/:tier/:username",
                "layanan": "/layanan[/:id], /layanan/search, /layanan/verifikasi/:id",
                "hattra": "/hattra[/:id], /hattra/search, /hattra/byUser/:username, /hattra/byLayanan/:id",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::auth::{generate_jwt, Claims, Role, Status};

    fn bearer(role: Role) -> String {
        let claims = Claims::new(format!("{}_tester", role.username_prefix()), role, Status::Active);
        format!("Bearer {}", generate_jwt(&claims).unwrap())
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    async fn json_of(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_describes_the_service() {
        let (status, body) = json_of(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Hattra API");
    }

    #[tokio::test]
    async fn anonymous_callers_get_401_on_gated_routes() {
        for (method, uri) in [
            ("GET", "/auth/whoami"),
            ("GET", "/users/search"),
            ("GET", "/provinsi"),
            ("GET", "/kestrad"),
            ("GET", "/org/kota/kota_bandung"),
            ("GET", "/layanan"),
            ("POST", "/layanan"),
            ("GET", "/hattra/7"),
            ("PATCH", "/hattra/7/verification"),
            ("DELETE", "/users/kota_bandung"),
        ] {
            let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn invalid_tokens_are_treated_as_anonymous() {
        let request = Request::get("/auth/whoami")
            .header(header::AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn whoami_echoes_the_token_identity() {
        let request = Request::get("/auth/whoami")
            .header(header::AUTHORIZATION, bearer(Role::Puskesmas))
            .body(Body::empty())
            .unwrap();
        let (status, body) = json_of(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "pusk_tester");
        assert_eq!(body["data"]["role"], "puskesmas");
    }

    #[tokio::test]
    async fn roles_below_the_gate_get_403() {
        let cases = [
            (Role::Provinsi, "GET", "/provinsi"),
            (Role::Kota, "GET", "/kota"),
            (Role::Puskesmas, "GET", "/puskesmas"),
            (Role::Kestrad, "GET", "/kestrad"),
            (Role::User, "GET", "/hattra"),
            (Role::User, "GET", "/org/kota/kota_bandung"),
            (Role::Puskesmas, "POST", "/hattra"),
            (Role::Kota, "PATCH", "/hattra/1"),
            (Role::Puskesmas, "PATCH", "/layanan/verifikasi/1"),
            (Role::Provinsi, "PATCH", "/hattra/1/verification/unverify"),
        ];
        for (role, method, uri) in cases {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, bearer(role))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            assert_eq!(status_of(request).await, StatusCode::FORBIDDEN, "{role} {method} {uri}");
        }
    }

    #[tokio::test]
    async fn gate_answers_before_body_parsing() {
        let request = Request::post("/layanan")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_numeric_ids_are_bad_requests_once_admitted() {
        let request = Request::get("/hattra/abc")
            .header(header::AUTHORIZATION, bearer(Role::Kestrad))
            .body(Body::empty())
            .unwrap();
        let (status, body) = json_of(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);
    }
}
