/// Authentication Routes
///
/// Thin HTTP handlers over the `AuthService` orchestrator. The wire
/// format uses camelCase field names throughout.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::Principal;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout accepts anything, so the field is optional rather than letting
/// body deserialization fail the request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// POST /auth/register
///
/// # Errors
/// - 400: missing email/password, short password, invalid email format
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let envelope = service
        .register(
            &form.email,
            &form.password,
            form.first_name.as_deref(),
            form.last_name.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Created().json(envelope))
}

/// POST /auth/login
///
/// # Errors
/// - 401: unknown email or wrong password, indistinguishably
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let envelope = service.login(&form.email, &form.password).await?;
    Ok(HttpResponse::Ok().json(envelope))
}

/// POST /auth/refresh
///
/// Rotates the submitted refresh token: it is consumed and a new pair is
/// issued.
///
/// # Errors
/// - 401: invalid, expired, rotated, or revoked refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let envelope = service.refresh(&form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(envelope))
}

/// POST /auth/logout
///
/// Always returns 200, even for malformed, unknown, or already-revoked
/// tokens.
pub async fn logout(
    form: web::Json<LogoutRequest>,
    service: web::Data<AuthService>,
) -> HttpResponse {
    service
        .logout(form.refresh_token.as_deref().unwrap_or_default())
        .await;

    HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" }))
}

/// GET /auth/me
///
/// Requires a valid Bearer access token; the principal is injected by the
/// authentication middleware.
///
/// # Errors
/// - 401: missing or invalid token (handled by middleware)
/// - 404: user vanished between authentication and lookup
pub async fn get_current_user(
    principal: web::ReqData<Principal>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = service.current_user(principal.id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}
