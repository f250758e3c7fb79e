//! Registration and login handlers.

use axum::{Json, extract::State, http::StatusCode};

use crate::error::Result;
use crate::routes::JsonBody;
use crate::services::{
    AuthService, CompleteRequest, LoginOutcome, LoginRequest, OtpIssued, OtpRequest, OtpVerified,
    RegistrationOutcome, RegistrationService, VerifyRequest,
};
use crate::state::AppState;

fn registration(state: &AppState) -> RegistrationService<'_> {
    RegistrationService::new(state.store(), state.sender(), state.tokens())
}

/// `POST /auth/otp/send`
pub async fn send_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<OtpRequest>,
) -> Result<Json<OtpIssued>> {
    let issued = registration(&state).request_otp(&request).await?;
    Ok(Json(issued))
}

/// `POST /auth/otp/verify`
pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyRequest>,
) -> Result<Json<OtpVerified>> {
    let verified = registration(&state).verify_otp(&request).await?;
    Ok(Json(verified))
}

/// `POST /auth/register/complete`
pub async fn complete_registration(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CompleteRequest>,
) -> Result<(StatusCode, Json<RegistrationOutcome>)> {
    let outcome = registration(&state).complete(&request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginOutcome>> {
    let outcome = AuthService::new(state.store(), state.tokens())
        .login(&request)
        .await?;
    Ok(Json(outcome))
}
