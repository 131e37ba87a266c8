//! Router behaviour that is decided before any database access.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::util::ServiceExt;

use tours::config::RunMode;
use tours::usecase::jwt::JwtService;
use uuid::Uuid;

mod common;

use common::{body_json, body_text, form_request, json_request, offline_app, test_config};

#[tokio::test]
async fn test_healthz() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app.oneshot(json_request("GET", "/healthz", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_unknown_api_route() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/nothing-here", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Can't find /api/v1/nothing-here on this server!");
}

#[tokio::test]
async fn test_invalid_id_is_not_found() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/tours/not-a-uuid", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Invalid id: not-a-uuid");
}

#[tokio::test]
async fn test_unsupported_operator_is_rejected() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/tours?price%5Bregex%5D=1", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Unsupported operator: regex");
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            None,
            Some(serde_json::json!({ "email": "jonas@example.com" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Please provide email and password!");
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_failure() {
    let app = offline_app(&test_config(RunMode::Production));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], "fail");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/users/me", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "You are not logged in! Please log in to get access."
    );
}

#[tokio::test]
async fn test_tampered_token() {
    let app = offline_app(&test_config(RunMode::Production));
    let token = JwtService::new("some-other-secret".to_string(), 90)
        .generate_token(Uuid::new_v4())
        .unwrap();

    let response = app
        .oneshot(json_request("GET", "/api/v1/reviews", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid token. Please log in again!"
    );
}

#[tokio::test]
async fn test_admin_routes_require_login_first() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("POST", "/api/v1/users", None, Some(serde_json::json!({}))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_development_errors_carry_detail() {
    let app = offline_app(&test_config(RunMode::Development));

    let response = app
        .oneshot(json_request("GET", "/api/v1/tours/42", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Invalid id: 42");
    assert_eq!(body["error"]["kind"], "not_found");
    assert!(body["error"]["detail"].as_str().unwrap().contains("NotFound"));
}

#[tokio::test]
async fn test_production_errors_omit_detail() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/tours/42", None, None))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_rate_limit() {
    let mut config = test_config(RunMode::Production);
    config.rate_limit_max = 2;
    let app = offline_app(&config);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request("GET", "/api/v1/tours/nope", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = app
        .oneshot(json_request("GET", "/api/v1/tours/nope", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["message"],
        "Too many requests from this IP, please try again in an hour!"
    );
}

#[tokio::test]
async fn test_rate_limit_ignores_spoofed_forwarded_for() {
    let mut config = test_config(RunMode::Production);
    config.rate_limit_max = 2;
    let app = offline_app(&config);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let mut request = json_request("GET", "/api/v1/tours/nope", None, None);
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("203.0.113.{i}").parse().unwrap());
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }

    assert_eq!(
        statuses,
        [
            StatusCode::NOT_FOUND,
            StatusCode::NOT_FOUND,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(json_request("GET", "/api/v1/users/logout", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("jwt=loggedout;"));
    assert!(cookie.contains("Max-Age=10"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_account_page_requires_login() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("Something went wrong!"));
    assert!(html.contains("You are not logged in!"));
}

#[tokio::test]
async fn test_security_headers() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app.oneshot(json_request("GET", "/healthz", None, None)).await.unwrap();

    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert!(response.headers().contains_key("x-frame-options"));
}

#[tokio::test]
async fn test_login_page_accepts_form_posts() {
    let app = offline_app(&test_config(RunMode::Production));

    let response = app
        .oneshot(form_request("/login", "email=jonas%40example.com"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("Something went wrong!"));
    assert!(html.contains("Please provide email and password!"));
}

#[tokio::test]
async fn test_oversized_json_body_is_rejected() {
    let app = offline_app(&test_config(RunMode::Production));
    let padding = "x".repeat(11 * 1024);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            None,
            Some(serde_json::json!({ "email": "a@example.com", "password": padding })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["message"], "Request body is too large");
}
