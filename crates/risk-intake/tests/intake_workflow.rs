//! End-to-end scenarios for the building risk intake: questionnaire, live scoring, submission through a
//! real HTTP prediction call, and reading records back through the public router.

mod common {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use risk_intake::assessment::{
        AuthError, AuthErrorCode, Credentials, CurrentUser, FederatedLogin, IdentityProvider,
        OwnerId, RecordId, RepositoryError, Session, SessionToken, SignupRequest,
        StoredSubmission, SubmissionStore, VerificationNotice,
    };
    use risk_intake::config::PredictionConfig;

    pub(super) const TOKEN: &str = "inspector-token";
    pub(super) const OWNER: &str = "inspector-1";

    #[derive(Default)]
    pub(super) struct DocumentStore {
        records: Mutex<Vec<(OwnerId, StoredSubmission)>>,
    }

    impl DocumentStore {
        pub(super) fn seed(&self, owner: &str, id: &str, document: Value) {
            self.records.lock().expect("store mutex poisoned").push((
                OwnerId(owner.to_string()),
                StoredSubmission {
                    id: RecordId(id.to_string()),
                    document,
                },
            ));
        }

        pub(super) fn len(&self) -> usize {
            self.records.lock().expect("store mutex poisoned").len()
        }
    }

    impl SubmissionStore for DocumentStore {
        fn create(&self, owner: &OwnerId, mut document: Value) -> Result<RecordId, RepositoryError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            let id = RecordId(format!("doc-{}", guard.len() + 1));
            document["createdAt"] = json!(1_767_225_600_000_i64 + guard.len() as i64);
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
            Ok(self
                .records
                .lock()
                .expect("store mutex poisoned")
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
            Ok(self
                .records
                .lock()
                .expect("store mutex poisoned")
                .iter()
                .find(|(record_owner, record)| record_owner == owner && &record.id == id)
                .map(|(_, record)| record.clone()))
        }
    }

    pub(super) struct OneInspector {
        sessions: Mutex<HashMap<String, CurrentUser>>,
    }

    impl Default for OneInspector {
        fn default() -> Self {
            let mut sessions = HashMap::new();
            sessions.insert(
                TOKEN.to_string(),
                CurrentUser {
                    id: OwnerId(OWNER.to_string()),
                    display_name: Some("Field Inspector".to_string()),
                    email: Some("inspector@example.com".to_string()),
                },
            );
            Self {
                sessions: Mutex::new(sessions),
            }
        }
    }

    impl IdentityProvider for OneInspector {
        fn current_user(&self, token: &SessionToken) -> Option<CurrentUser> {
            self.sessions
                .lock()
                .expect("identity mutex poisoned")
                .get(&token.0)
                .cloned()
        }

        fn login_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
            if credentials.email != "inspector@example.com" {
                return Err(AuthErrorCode::UserNotFound.into());
            }
            Err(AuthErrorCode::EmailNotVerified.into())
        }

        fn login_federated(&self, _login: &FederatedLogin) -> Result<Session, AuthError> {
            Err(AuthErrorCode::CancelledPopupRequest.into())
        }

        fn signup(&self, _request: &SignupRequest) -> Result<VerificationNotice, AuthError> {
            Err(AuthErrorCode::EmailAlreadyInUse.into())
        }

        fn resend_verification(
            &self,
            _credentials: &Credentials,
        ) -> Result<VerificationNotice, AuthError> {
            Err(AuthErrorCode::WeakPassword.into())
        }

        fn logout(&self, token: &SessionToken) -> Result<(), AuthError> {
            self.sessions
                .lock()
                .expect("identity mutex poisoned")
                .remove(&token.0);
            Ok(())
        }
    }

    /// Serves `/predict` on an ephemeral port; fault distance 3 yields HIGH with a reason.
    pub(super) async fn spawn_predictor() -> PredictionConfig {
        let router = Router::new().route(
            "/predict",
            post(|Json(features): Json<Value>| async move {
                let near_fault = features["A1_2_FAULT_DISTANCE"] == json!(3.0);
                let index = features["RISK_INDEX_0_10"].as_f64().unwrap_or_default();
                if near_fault {
                    Json(json!({
                        "score": index / 10.0,
                        "risk": "HIGH",
                        "reasons": ["Very near fault line (<5 km)."],
                        "model_version": "rf-test"
                    }))
                } else {
                    Json(json!({
                        "score": index / 10.0,
                        "risk": "MEDIUM",
                        "reasons": [],
                        "model_version": "rf-test"
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind predictor");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("predictor runs");
        });
        PredictionConfig::from_base_url(&format!("http://{addr}/")).expect("valid url")
    }

    pub(super) fn answers(fault_distance: u8) -> Value {
        let mut answers = serde_json::Map::new();
        for question in risk_intake::assessment::QuestionCatalog::standard().questions() {
            answers.insert(question.code.to_string(), json!(2));
        }
        answers.insert("A1.2".to_string(), json!(fault_distance));
        Value::Object(answers)
    }

    pub(super) fn submission(name: &str, fault_distance: u8) -> Value {
        json!({
            "meta": {
                "buildingName": name,
                "buildingUniqueCode": format!("{}-01", &name[..3].to_uppercase()),
                "address": "Colon St, Cebu City",
                "coordinatesLat": 10.2966,
                "coordinatesLng": 123.9005,
                "yearBuilt": 1975
            },
            "answers": answers(fault_distance),
            "notes": "  Spalling at ground floor columns.  "
        })
    }

    pub(super) async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        use tower::ServiceExt;

        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("json")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes")
    }

    pub(super) async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }
}

use std::sync::Arc;

use axum::http::StatusCode;
use reqwest::Client;
use risk_intake::assessment::{intake_router, HttpPredictionClient, IntakeService};
use serde_json::json;

use common::*;

async fn live_router() -> (axum::Router, Arc<DocumentStore>) {
    let config = spawn_predictor().await;
    let client = Client::builder().no_proxy().build().expect("http client");
    let predictor = Arc::new(HttpPredictionClient::with_client(client, &config));
    let store = Arc::new(DocumentStore::default());
    let service = Arc::new(IntakeService::new(store.clone(), predictor));
    let router = intake_router(service, Arc::new(OneInspector::default()));
    (router, store)
}

#[tokio::test]
async fn submission_round_trips_through_prediction_and_viewer() {
    let (router, store) = live_router().await;

    let response = call(
        &router,
        "POST",
        "/api/v1/assessments",
        Some(submission("Cathedral Annex", 3)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_body(response).await;
    assert_eq!(receipt["id"], "doc-1");
    assert_eq!(receipt["prediction"]["risk"], "HIGH");
    assert_eq!(receipt["prediction"]["model_version"], "rf-test");
    assert_eq!(store.len(), 1);

    let response = call(&router, "GET", "/api/v1/assessments/doc-1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let details = json_body(response).await;
    assert_eq!(details["title"], "Cathedral Annex — Details");
    assert_eq!(details["answer_source"], "questionnaire");
    assert_eq!(details["notes"], "Spalling at ground floor columns.");
    assert_eq!(
        details["prediction"]["description"],
        "Very near fault line (<5 km)."
    );
}

#[tokio::test]
async fn summary_lists_current_and_legacy_layouts_newest_first() {
    let (router, store) = live_router().await;
    store.seed(
        OWNER,
        "legacy-1",
        json!({
            "ownerId": OWNER,
            "meta": { "building_name": "Old Market", "code": "OM-07", "lat": 10.29, "lng": 123.9 },
            "features": { "A1_1_PEIS": 3, "HAZARD_SCORE": 75 },
            "prediction": { "score": 0.91, "risk": "HIGH", "reasons": [], "modelVersion": "rf-2023" },
            "createdAt": { "seconds": 1_700_000_000, "nanoseconds": 0 }
        }),
    );
    store.seed("someone-else", "foreign-1", json!({ "meta": { "buildingName": "Hidden" } }));

    let response = call(
        &router,
        "POST",
        "/api/v1/assessments",
        Some(submission("Basilica Wing", 1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = call(&router, "GET", "/api/v1/assessments", None).await;
    let list = json_body(response).await;
    let rows = list["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["building_name"], "Basilica Wing");
    assert_eq!(rows[0]["risk_description"], "MODERATE");
    assert_eq!(rows[1]["building_unique_code"], "OM-07");
    assert_eq!(rows[1]["coordinates"], "10.29000, 123.90000");

    let response = call(
        &router,
        "GET",
        "/api/v1/assessments?sort=risk_index&dir=desc",
        None,
    )
    .await;
    let list = json_body(response).await;
    assert_eq!(list["rows"][0]["id"], "legacy-1");

    let response = call(&router, "GET", "/api/v1/assessments/legacy-1", None).await;
    let details = json_body(response).await;
    assert_eq!(details["answer_source"], "flat_features");
    assert_eq!(details["prediction"]["model_version"], "rf-2023");

    let response = call(&router, "GET", "/api/v1/assessments/foreign-1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auth_errors_map_to_statuses_and_messages() {
    let (router, _) = live_router().await;

    let response = call(
        &router,
        "POST",
        "/api/v1/auth/login",
        Some(json!({ "email": "inspector@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = json_body(response).await;
    assert_eq!(payload["code"], "auth/email-not-verified");

    let response = call(
        &router,
        "POST",
        "/api/v1/auth/signup",
        Some(json!({ "email": "inspector@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = call(
        &router,
        "POST",
        "/api/v1/auth/resend-verification",
        Some(json!({ "email": "inspector@example.com", "password": "123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = call(
        &router,
        "POST",
        "/api/v1/auth/login/federated",
        Some(json!({ "provider": "google", "assertion": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
