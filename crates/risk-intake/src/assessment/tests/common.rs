use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::assessment::auth::{
    AuthError, AuthErrorCode, Credentials, CurrentUser, FederatedLogin, IdentityProvider,
    Session, SessionToken, SignupRequest, VerificationNotice,
};
use crate::assessment::prediction::{PredictRequest, PredictionClient, PredictionError};
use crate::assessment::repository::{RepositoryError, StoredSubmission, SubmissionStore};
use crate::assessment::{
    intake_router, AnswerSet, AnswerValue, BuildingMeta, IntakeService, OwnerId, Prediction,
    QuestionCatalog, QuestionCode, RecordId, RiskLevel, SubmissionRequest,
};

pub(super) const OWNER: &str = "user-ana";
pub(super) const TOKEN: &str = "token-ana";

pub(super) fn code(raw: &str) -> QuestionCode {
    raw.parse().expect("valid question code")
}

pub(super) fn catalog() -> &'static QuestionCatalog {
    QuestionCatalog::standard()
}

pub(super) fn uniform_answers(value: u8) -> AnswerSet {
    AnswerSet::uniform(catalog(), AnswerValue::new(value).expect("value on scale"))
}

pub(super) fn meta() -> BuildingMeta {
    BuildingMeta {
        building_name: "Mivela Tower A".to_string(),
        building_unique_code: "MVL-A-0001".to_string(),
        address: "12 Osmeña Blvd, Cebu City".to_string(),
        coordinates_lat: Some(10.3157),
        coordinates_lng: Some(123.8854),
        building_type: "Residential".to_string(),
        building_lot: "Lot 4".to_string(),
        year_built: Some(1998),
        number_of_storeys: Some(12),
    }
}

pub(super) fn request() -> SubmissionRequest {
    SubmissionRequest {
        meta: meta(),
        answers: uniform_answers(2),
        notes: "Visible cracks on the east wall.".to_string(),
    }
}

pub(super) fn session() -> Session {
    Session {
        token: SessionToken(TOKEN.to_string()),
        user: CurrentUser {
            id: OwnerId(OWNER.to_string()),
            display_name: Some("Ana Reyes".to_string()),
            email: Some("ana@example.com".to_string()),
        },
    }
}

pub(super) fn prediction(risk: RiskLevel) -> Prediction {
    Prediction {
        score: 0.4312,
        risk,
        reasons: vec!["Very near fault line (<5 km).".to_string()],
        model_version: "local-v1".to_string(),
    }
}

/// A stored document in the current layout, as the service writes it.
pub(super) fn stored(id: &str, name: &str, score: f64, created_at: &str) -> StoredSubmission {
    StoredSubmission {
        id: RecordId(id.to_string()),
        document: json!({
            "ownerId": OWNER,
            "meta": { "buildingName": name, "buildingUniqueCode": format!("CODE-{id}") },
            "features": { "questionnaire": { "A1.1": 3, "HAZARD_SCORE": 75 } },
            "notes": "",
            "prediction": { "score": score, "risk": "LOW", "reasons": [], "model_version": "v1" },
            "createdAt": created_at,
        }),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<Vec<(OwnerId, StoredSubmission)>>>,
}

impl MemoryStore {
    pub(super) fn documents(&self) -> Vec<StoredSubmission> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub(super) fn seed(&self, owner: &str, record: StoredSubmission) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push((OwnerId(owner.to_string()), record));
    }
}

impl SubmissionStore for MemoryStore {
    fn create(&self, owner: &OwnerId, mut document: Value) -> Result<RecordId, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let id = RecordId(format!("rec-{:03}", guard.len() + 1));
        let base: DateTime<Utc> = "2024-05-01T08:00:00Z".parse().expect("valid stamp");
        let stamp = base + Duration::minutes(guard.len() as i64);
        document["createdAt"] = Value::String(stamp.to_rfc3339());
        guard.push((
            owner.clone(),
            StoredSubmission {
                id: id.clone(),
                document,
            },
        ));
        Ok(id)
    }

    fn query(&self, owner: &OwnerId) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|(record_owner, _)| record_owner == owner)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn fetch(
        &self,
        owner: &OwnerId,
        id: &RecordId,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .find(|(record_owner, record)| record_owner == owner && &record.id == id)
            .map(|(_, record)| record.clone()))
    }
}

pub(super) struct UnavailableStore;

impl SubmissionStore for UnavailableStore {
    fn create(&self, _owner: &OwnerId, _document: Value) -> Result<RecordId, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn query(&self, _owner: &OwnerId) -> Result<Vec<StoredSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }

    fn fetch(
        &self,
        _owner: &OwnerId,
        _id: &RecordId,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("document store offline".to_string()))
    }
}

/// Prediction double that counts calls and yields once before answering.
pub(super) struct StubPredictor {
    calls: AtomicUsize,
    last_request: Mutex<Option<PredictRequest>>,
    outcome: Result<Prediction, PredictionError>,
}

impl StubPredictor {
    pub(super) fn returning(risk: RiskLevel) -> Self {
        Self::with_outcome(Ok(prediction(risk)))
    }

    pub(super) fn failing(status: u16, body: &str) -> Self {
        Self::with_outcome(Err(PredictionError::Status {
            status,
            body: body.to_string(),
        }))
    }

    fn with_outcome(outcome: Result<Prediction, PredictionError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            outcome,
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn last_request(&self) -> Option<PredictRequest> {
        self.last_request
            .lock()
            .expect("predictor mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl PredictionClient for StubPredictor {
    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("predictor mutex poisoned") = Some(request.clone());
        tokio::task::yield_now().await;
        self.outcome.clone()
    }
}

/// Identity double with one signed-in token; federated assertions name the error code to raise.
#[derive(Default)]
pub(super) struct StubIdentity {
    sessions: Mutex<HashMap<String, CurrentUser>>,
}

impl StubIdentity {
    pub(super) fn signed_in() -> Self {
        let identity = Self::default();
        identity
            .sessions
            .lock()
            .expect("identity mutex poisoned")
            .insert(TOKEN.to_string(), session().user);
        identity
    }
}

impl IdentityProvider for StubIdentity {
    fn current_user(&self, token: &SessionToken) -> Option<CurrentUser> {
        self.sessions
            .lock()
            .expect("identity mutex poisoned")
            .get(&token.0)
            .cloned()
    }

    fn login_with_password(&self, _credentials: &Credentials) -> Result<Session, AuthError> {
        Err(AuthErrorCode::InvalidCredential.into())
    }

    fn login_federated(&self, login: &FederatedLogin) -> Result<Session, AuthError> {
        Err(AuthError::from_provider(
            Some(&login.assertion),
            "federated sign-in failed",
        ))
    }

    fn signup(&self, request: &SignupRequest) -> Result<VerificationNotice, AuthError> {
        Ok(VerificationNotice::sent_to(request.email.clone()))
    }

    fn resend_verification(
        &self,
        credentials: &Credentials,
    ) -> Result<VerificationNotice, AuthError> {
        Ok(VerificationNotice::sent_to(credentials.email.clone()))
    }

    fn logout(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.sessions
            .lock()
            .expect("identity mutex poisoned")
            .remove(&token.0);
        Ok(())
    }
}

pub(super) fn build_service(
    predictor: StubPredictor,
) -> (
    IntakeService<MemoryStore, StubPredictor>,
    Arc<MemoryStore>,
    Arc<StubPredictor>,
) {
    let store = Arc::new(MemoryStore::default());
    let predictor = Arc::new(predictor);
    let service = IntakeService::new(store.clone(), predictor.clone());
    (service, store, predictor)
}

pub(super) fn build_router(
    predictor: StubPredictor,
) -> (Router, Arc<MemoryStore>, Arc<StubPredictor>) {
    let (service, store, predictor) = build_service(predictor);
    let router = intake_router(Arc::new(service), Arc::new(StubIdentity::signed_in()));
    (router, store, predictor)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
