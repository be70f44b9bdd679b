mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{mock_db, mock_state, user_model};
use ecomm_api::{
    app::build_router,
    error::{FORBIDDEN, NOT_AUTHORIZED},
    models::Role,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const BODY_LIMIT: usize = 1024 * 1024;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_served_with_a_request_id() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(Request::get("/api/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["data"]["path"], "/api/nowhere");
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(Request::get("/api/auth/profile").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], NOT_AUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(
            Request::get("/api/order/my")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_a_deleted_user_is_unauthorized() {
    let user = user_model(Role::User, "password123");
    let db = mock_db().append_query_results([Vec::<ecomm_api::entity::users::Model>::new()]);
    let (state, _) = mock_state(db);
    let token = state.jwt.issue(user.id, Role::User).unwrap();
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(
            Request::get("/api/auth/profile")
                .header(header::COOKIE, format!("token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_reads_the_cookie_token() {
    let user = user_model(Role::Moderator, "password123");
    let (state, _) = mock_state(mock_db().append_query_results([vec![user.clone()]]));
    let token = state.jwt.issue(user.id, Role::Moderator).unwrap();
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(
            Request::get("/api/auth/profile")
                .header(header::COOKIE, format!("token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], user.email);
    assert_eq!(body["data"]["role"], "MODERATOR");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn non_admin_on_admin_route_is_forbidden() {
    let user = user_model(Role::User, "password123");
    let (state, _) = mock_state(mock_db().append_query_results([vec![user.clone()]]));
    let token = state.jwt.issue(user.id, Role::User).unwrap();
    let app = build_router(state, BODY_LIMIT);

    let mut request = json_request("POST", "/api/collection", json!({ "name": "Hats" }));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_sets_an_http_only_cookie() {
    let user = user_model(Role::User, "password123");
    let (state, _) = mock_state(mock_db().append_query_results([vec![user.clone()]]));
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": user.email, "password": "password123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert!(cookie.contains(body["data"]["token"].as_str().unwrap()));
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let (state, _) = mock_state(mock_db());
    let app = build_router(state, BODY_LIMIT);

    let response = app
        .oneshot(Request::get("/api/auth/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
    let body = body_json(response).await;
    assert_eq!(body["message"], "Logged Out");
}

#[tokio::test]
async fn product_form_without_fields_is_rejected() {
    let admin = user_model(Role::Admin, "password123");
    let (state, _) = mock_state(mock_db().append_query_results([vec![admin.clone()]]));
    let token = state.jwt.issue(admin.id, Role::Admin).unwrap();
    let app = build_router(state, BODY_LIMIT);

    let boundary = "XBOUNDARY";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nTee\r\n--{boundary}--\r\n"
    );
    let request = Request::post("/api/product")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Please fill all the fields");
}

#[tokio::test]
async fn non_admins_cannot_post_product_forms() {
    let shopper = user_model(Role::User, "password123");
    let (state, _) = mock_state(mock_db().append_query_results([vec![shopper.clone()]]));
    let token = state.jwt.issue(shopper.id, Role::User).unwrap();
    let app = build_router(state, BODY_LIMIT);

    let boundary = "XBOUNDARY";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nTee\r\n--{boundary}--\r\n"
    );
    let request = Request::post("/api/product")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], FORBIDDEN);
}
