//! User endpoints
//!
//! Registration, login, profile update and one-time credential linking.

use axum::{Json, extract::State, http::StatusCode};

use super::dto::{
    AccountResponse, AuthResponse, Envelope, LinkEmailRequest, LinkPhoneRequest, LoginRequest,
    RegisterRequest, UpdateProfileRequest,
};
use super::extract::ValidatedJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{CredentialType, ProfilePatch};
use crate::error::AppError;

fn credential_type(raw: &str) -> Result<CredentialType, AppError> {
    CredentialType::parse(raw)
        .ok_or_else(|| AppError::BadRequest(format!("unknown credential type: {raw}")))
}

/// POST /v1/user/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), AppError> {
    let session = state
        .users
        .register(
            credential_type(&req.credential_type)?,
            req.credential_value,
            req.name,
            req.password,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            AuthResponse::registered(session),
        )),
    ))
}

/// POST /v1/user/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<Envelope<AuthResponse>>, AppError> {
    let session = state
        .users
        .login(
            credential_type(&req.credential_type)?,
            &req.credential_value,
            req.password,
        )
        .await?;

    Ok(Json(Envelope::with_message(
        "User logged successfully",
        AuthResponse::logged_in(session),
    )))
}

/// PATCH /v1/user
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<Envelope<AccountResponse>>, AppError> {
    let patch = ProfilePatch {
        name: req.name,
        image_url: req.image_url,
    };
    let account = state.users.update_profile(&user.id, patch).await?;

    Ok(Json(Envelope::with_message(
        "Profile updated successfully",
        account.into(),
    )))
}

/// POST /v1/user/link
pub async fn link_email(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<LinkEmailRequest>,
) -> Result<Json<Envelope<AccountResponse>>, AppError> {
    let account = state.users.link_email(&user.id, &req.email).await?;

    Ok(Json(Envelope::with_message(
        "Email linked successfully",
        account.into(),
    )))
}

/// POST /v1/user/link/phone
pub async fn link_phone(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<LinkPhoneRequest>,
) -> Result<Json<Envelope<AccountResponse>>, AppError> {
    let account = state.users.link_phone(&user.id, &req.phone).await?;

    Ok(Json(Envelope::with_message(
        "Phone linked successfully",
        account.into(),
    )))
}
