use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::answers::AnswerSet;
use super::auth::{
    AuthError, AuthErrorCode, Credentials, FederatedLogin, IdentityProvider, Session,
    SessionToken, SignupRequest,
};
use super::domain::{RecordId, SubmissionRequest};
use super::prediction::PredictionClient;
use super::repository::{RepositoryError, SubmissionStore};
use super::service::IntakeService;
use super::summary::{SortDirection, SortKey, SortState};
use crate::error::AppError;

/// Shared handler state: the intake service plus the identity seam.
pub struct IntakeState<S, P, I> {
    pub service: Arc<IntakeService<S, P>>,
    pub identity: Arc<I>,
}

impl<S, P, I> Clone for IntakeState<S, P, I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            identity: Arc::clone(&self.identity),
        }
    }
}

/// Router builder exposing the questionnaire, submission, summary, and auth endpoints.
pub fn intake_router<S, P, I>(service: Arc<IntakeService<S, P>>, identity: Arc<I>) -> Router
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/questions", get(questions_handler::<S, P, I>))
        .route("/api/v1/assessments/score", post(score_handler::<S, P, I>))
        .route(
            "/api/v1/assessments",
            post(submit_handler::<S, P, I>).get(list_handler::<S, P, I>),
        )
        .route("/api/v1/assessments/:record_id", get(details_handler::<S, P, I>))
        .route("/api/v1/auth/signup", post(signup_handler::<S, P, I>))
        .route("/api/v1/auth/login", post(login_handler::<S, P, I>))
        .route(
            "/api/v1/auth/login/federated",
            post(federated_login_handler::<S, P, I>),
        )
        .route(
            "/api/v1/auth/resend-verification",
            post(resend_verification_handler::<S, P, I>),
        )
        .route("/api/v1/auth/logout", post(logout_handler::<S, P, I>))
        .route("/api/v1/auth/me", get(me_handler::<S, P, I>))
        .with_state(IntakeState { service, identity })
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(SessionToken::from_bearer)
}

fn require_session<I: IdentityProvider>(
    headers: &HeaderMap,
    identity: &I,
) -> Result<Session, Response> {
    bearer_token(headers)
        .and_then(|token| identity.session(&token))
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "Not logged in."))
}

fn auth_error_response(error: AuthError) -> Response {
    let Some(message) = error.user_message() else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let status = match error.kind() {
        Some(
            AuthErrorCode::InvalidCredential
            | AuthErrorCode::WrongPassword
            | AuthErrorCode::UserNotFound
            | AuthErrorCode::EmailNotVerified,
        ) => StatusCode::UNAUTHORIZED,
        Some(AuthErrorCode::EmailAlreadyInUse) => StatusCode::CONFLICT,
        Some(AuthErrorCode::WeakPassword) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(AuthErrorCode::VerificationSent) => StatusCode::ACCEPTED,
        _ => StatusCode::BAD_REQUEST,
    };
    let payload = json!({
        "error": message,
        "code": error.code(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn questions_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let questions: Vec<_> = state
        .service
        .catalog()
        .questions()
        .iter()
        .map(|question| {
            json!({
                "code": question.code,
                "group": question.code.group(),
                "legacy_key": question.legacy_key,
                "title": question.title,
                "prompt": question.prompt,
                "weight": question.weight,
                "choices": question.choices.choices(),
            })
        })
        .collect();
    (StatusCode::OK, axum::Json(questions)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(default)]
    answers: AnswerSet,
}

pub(crate) async fn score_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let report = state.service.score(&request.answers);
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn submit_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let session = match require_session(&headers, state.identity.as_ref()) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.service.submit(&session, request).await {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    sort: Option<SortKey>,
    dir: Option<SortDirection>,
}

pub(crate) async fn list_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let session = match require_session(&headers, state.identity.as_ref()) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let sort = query
        .sort
        .map(|key| SortState::new(key, query.dir.unwrap_or_default()));
    match state.service.summary(&session, sort) {
        Ok(list) => {
            let payload = json!({
                "sort": list.sort(),
                "rows": list.views(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => AppError::from(other).into_response(),
    }
}

pub(crate) async fn details_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    headers: HeaderMap,
    Path(record_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let session = match require_session(&headers, state.identity.as_ref()) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let id = RecordId(record_id);
    match state.service.details(&session, &id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(RepositoryError::NotFound) => {
            let payload = json!({
                "error": "record not found",
                "id": id,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => AppError::from(other).into_response(),
    }
}

pub(crate) async fn signup_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    axum::Json(request): axum::Json<SignupRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    match state.identity.signup(&request) {
        Ok(notice) => (StatusCode::ACCEPTED, axum::Json(notice)).into_response(),
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn login_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    axum::Json(credentials): axum::Json<Credentials>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    match state.identity.login_with_password(&credentials) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => {
            debug!(code = ?error.code(), "password login failed");
            auth_error_response(error)
        }
    }
}

pub(crate) async fn federated_login_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    axum::Json(login): axum::Json<FederatedLogin>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    match state.identity.login_federated(&login) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(error) => {
            debug!(code = ?error.code(), provider = %login.provider, "federated login failed");
            auth_error_response(error)
        }
    }
}

pub(crate) async fn resend_verification_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    axum::Json(credentials): axum::Json<Credentials>,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    match state.identity.resend_verification(&credentials) {
        Ok(notice) => (StatusCode::ACCEPTED, axum::Json(notice)).into_response(),
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn logout_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    headers: HeaderMap,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match state.identity.logout(&token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn me_handler<S, P, I>(
    State(state): State<IntakeState<S, P, I>>,
    headers: HeaderMap,
) -> Response
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
    I: IdentityProvider + 'static,
{
    match require_session(&headers, state.identity.as_ref()) {
        Ok(session) => (StatusCode::OK, axum::Json(session.user)).into_response(),
        Err(response) => response,
    }
}
