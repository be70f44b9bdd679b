use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    dto::auth::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
    },
    error::AppResult,
    extract::AppJson,
    middleware::auth::{AuthUser, expired_cookie, session_cookie},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/profile", get(profile))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/{token}", post(reset_password))
}

/// Sets the session cookie alongside the JSON body.
fn with_session(jar: CookieJar, auth: AuthResponse) -> (CookieJar, Json<ApiResponse<AuthResponse>>) {
    let jar = jar.add(session_cookie(auth.token.clone()));
    (jar, Json(ApiResponse::success("Success", auth, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Signed up and logged in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Missing fields, invalid input or user exists")
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<AuthResponse>>)> {
    let auth = auth_service::signup(&state, payload).await?;
    Ok(with_session(jar, auth))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<AuthResponse>>)> {
    let auth = auth_service::login(&state, payload).await?;
    Ok(with_session(jar, auth))
}

#[utoipa::path(
    get,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared")
    ),
    tag = "Auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (jar.add(expired_cookie()), Json(ApiResponse::message("Logged Out")))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn profile(user: AuthUser) -> Json<ApiResponse<User>> {
    Json(auth_service::profile(&user))
}

#[utoipa::path(
    post,
    path = "/api/auth/password/forgot",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/password/reset/{token}",
    params(
        ("token" = String, Path, description = "Token from the reset email")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed and logged in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Token invalid or expired, or passwords differ")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<AuthResponse>>)> {
    let auth = auth_service::reset_password(&state, &token, payload).await?;
    Ok(with_session(jar, auth))
}
