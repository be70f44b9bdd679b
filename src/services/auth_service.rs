use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::auth::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    response::{ApiResponse, Meta},
    state::AppState,
    utils::{
        mailer::MailMessage,
        password::{hash_password, verify_password},
        token::{RESET_TOKEN_TTL_MINUTES, digest_reset_token, generate_reset_token},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<AuthResponse> {
    let payload = SignupRequest {
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        password: payload.password,
    };
    if payload.name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Please add all fields"));
    }
    payload.validate()?;

    let exist = Users::find()
        .filter(UserCol::Email.eq(payload.email.as_str()))
        .one(&*state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::bad_request("User already exists"));
    }

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        email: Set(payload.email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(Role::User.as_str().to_string()),
        forgot_password_token: Set(None),
        forgot_password_expiry: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&*state.orm)
    .await
    .map_err(|err| AppError::on_conflict(err, "User already exists"))?;

    tracing::info!(user_id = %user.id, "user signed up");
    issue_session(state, User::from(user))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<AuthResponse> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Please fill all details"));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::bad_request(INVALID_CREDENTIALS))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::bad_request(INVALID_CREDENTIALS));
    }

    tracing::info!(user_id = %user.id, "user logged in");
    issue_session(state, User::from(user))
}

pub fn profile(user: &AuthUser) -> ApiResponse<User> {
    ApiResponse::success("Profile", user.user.clone(), Some(Meta::empty()))
}

/// Stores the digest of a fresh reset token and mails the raw token to the user.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let (token, digest) = generate_reset_token();
    let expiry = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    let mut active: UserActive = user.into();
    active.forgot_password_token = Set(Some(digest));
    active.forgot_password_expiry = Set(Some(expiry.into()));
    active.updated_at = Set(Utc::now().into());
    let user = active.update(&*state.orm).await?;

    let reset_url = format!("{}/api/auth/password/reset/{}", state.public_url, token);
    let message = MailMessage {
        to: user.email.clone(),
        subject: "Password reset".to_string(),
        text: format!(
            "Your password reset url is\n\n{reset_url}\n\nIf this was not requested by you, please ignore this email."
        ),
    };

    if let Err(err) = state.mailer.send(message).await {
        tracing::warn!(user_id = %user.id, error = %err, "reset email failed, clearing token");
        let mut active: UserActive = user.into();
        active.forgot_password_token = Set(None);
        active.forgot_password_expiry = Set(None);
        active.update(&*state.orm).await?;
        return Err(err.into());
    }

    Ok(ApiResponse::success(
        format!("Email sent to {}", user.email),
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    payload: ResetPasswordRequest,
) -> AppResult<AuthResponse> {
    if payload.password != payload.confirm_password {
        return Err(AppError::bad_request(
            "Password and confirm password does not match",
        ));
    }
    payload.validate()?;

    let now = Utc::now();
    let user = Users::find()
        .filter(UserCol::ForgotPasswordToken.eq(digest_reset_token(token)))
        .filter(UserCol::ForgotPasswordExpiry.gt(now))
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::bad_request("Password token is invalid or expired"))?;

    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.forgot_password_token = Set(None);
    active.forgot_password_expiry = Set(None);
    active.updated_at = Set(now.into());
    let user = active.update(&*state.orm).await?;

    tracing::info!(user_id = %user.id, "password reset");
    issue_session(state, User::from(user))
}

fn issue_session(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let token = state.jwt.issue(user.id, user.role)?;
    Ok(AuthResponse { token, user })
}
