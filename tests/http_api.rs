use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use knock_squared::backend::{
    InMemoryAuth, InMemoryPhotoStore, InMemoryStore, RecordingDispatcher,
};
use knock_squared::http::{api_router, KnockServices, ServiceSettings};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    dispatcher: Arc<RecordingDispatcher>,
}

fn test_app() -> TestApp {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let services = KnockServices::new(
        Arc::new(InMemoryAuth::default()),
        Arc::new(InMemoryStore::default()),
        Arc::new(InMemoryPhotoStore::default()),
        dispatcher.clone(),
        ServiceSettings::default(),
    );
    TestApp {
        router: api_router(Arc::new(services)),
        dispatcher,
    }
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn sign_up(router: &Router) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({
            "email": "owner@acme.test",
            "password": "hunter22",
            "company_name": "Acme HVAC"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["session"]["access_token"]
        .as_str()
        .expect("token issued")
        .to_string()
}

#[tokio::test]
async fn management_routes_require_a_bearer_token() {
    let app = test_app();
    let (status, body) = send(&app.router, Method::GET, "/api/v1/technicians", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth");

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/api/v1/technicians",
        Some("not-a-session"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_create_share_and_view_over_http() {
    let app = test_app();
    let token = sign_up(&app.router).await;

    let (status, company) =
        send(&app.router, Method::GET, "/api/v1/company", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(company["company_name"], "Acme HVAC");

    let (status, technician) = send(
        &app.router,
        Method::POST,
        "/api/v1/technicians",
        Some(&token),
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "title": "HVAC Tech",
            "years_experience": "12",
            "certifications": ["NATE Certified", " NATE Certified "]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(technician["years_experience"], 12);
    assert_eq!(technician["certifications"], json!(["NATE Certified"]));
    let id = technician["id"].as_str().expect("id").to_string();

    let (status, share) = send(
        &app.router,
        Method::POST,
        &format!("/api/v1/technicians/{id}/share"),
        Some(&token),
        Some(json!({
            "customer_name": "Pat",
            "delivery_method": "sms",
            "contact": "+15550100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(share["dismiss_after_ms"], 2000);
    assert_eq!(app.dispatcher.texts().len(), 1);

    let url = share["url"].as_str().expect("share url");
    let path = &url[url.find("/tech/").expect("profile path")..];
    let (status, profile) = send(&app.router, Method::GET, path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["first_name"], "Jane");
    assert_eq!(profile["company_name"], "Acme HVAC");
    assert_eq!(profile["primary_color"], "#0B2E51");

    let (status, analytics) =
        send(&app.router, Method::GET, "/api/v1/analytics", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["total_profile_views"], 1);
    assert_eq!(analytics["total_share_links"], 1);
    assert_eq!(analytics["most_viewed_technician"]["name"], "Jane Doe");
}

#[tokio::test]
async fn validation_and_missing_rows_map_to_client_errors() {
    let app = test_app();
    let token = sign_up(&app.router).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/technicians",
        Some(&token),
        Some(json!({ "first_name": "Jane", "last_name": "", "title": "HVAC Tech" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/api/v1/technicians/6f1c2a52-8a8e-4d0c-9d55-1f7a2b3c4d5e",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn fractional_years_and_inline_photos_are_validation_errors() {
    let app = test_app();
    let token = sign_up(&app.router).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/technicians",
        Some(&token),
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "title": "HVAC Tech",
            "years_experience": 4.5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/technicians",
        Some(&token),
        Some(json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "title": "HVAC Tech",
            "photo_url": "data:image/png;base64,iVBORw0KGgo="
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");

    let (_, roster) =
        send(&app.router, Method::GET, "/api/v1/technicians", Some(&token), None).await;
    assert_eq!(roster, json!([]));
}

#[tokio::test]
async fn delete_needs_confirmation_and_inactive_profiles_are_hidden() {
    let app = test_app();
    let token = sign_up(&app.router).await;

    let (status, seeded) = send(
        &app.router,
        Method::POST,
        "/api/v1/technicians/demo",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = seeded[0]["id"].as_str().expect("id").to_string();

    let (status, _) = send(
        &app.router,
        Method::PUT,
        &format!("/api/v1/technicians/{id}/active"),
        Some(&token),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app.router, Method::GET, &format!("/tech/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/v1/technicians/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation");

    let (status, _) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/v1/technicians/{id}?confirm=true"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, roster) =
        send(&app.router, Method::GET, "/api/v1/technicians", Some(&token), None).await;
    assert_eq!(roster.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn branding_round_trips_through_settings_routes() {
    let app = test_app();
    let token = sign_up(&app.router).await;

    let (status, settings) = send(
        &app.router,
        Method::GET,
        "/api/v1/company/settings",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["secondary_color"], "#39C0C3");

    let (status, updated) = send(
        &app.router,
        Method::PUT,
        "/api/v1/company/settings",
        Some(&token),
        Some(json!({
            "logo_url": null,
            "primary_color": "#000000",
            "secondary_color": "#FFFFFF"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["primary_color"], "#000000");
}
