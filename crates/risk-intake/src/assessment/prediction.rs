use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::answers::AnswerSet;
use super::catalog::QuestionCatalog;
use super::domain::Prediction;
use super::scoring::DerivedScores;
use crate::config::PredictionConfig;

/// Flat feature payload sent to the prediction service.
///
/// Answers are keyed by the underscore feature names the model was trained on
/// (`A1_2_FAULT_DISTANCE`), followed by the five derived score fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PredictRequest(BTreeMap<String, f64>);

impl PredictRequest {
    pub fn new(catalog: &QuestionCatalog, answers: &AnswerSet, scores: &DerivedScores) -> Self {
        let mut features: BTreeMap<String, f64> = catalog
            .questions()
            .iter()
            .filter_map(|question| {
                answers
                    .get(question.code)
                    .map(|value| (question.legacy_key.to_string(), f64::from(value.get())))
            })
            .collect();
        for (name, value) in scores.fields() {
            features.insert(name.to_string(), value);
        }
        Self(features)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("Predict failed ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("prediction service unreachable: {0}")]
    Transport(String),
    #[error("prediction response could not be decoded: {0}")]
    Decode(String),
}

/// Remote risk classifier consulted once per submission.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictionError>;
}

/// JSON-over-HTTP client for the `/predict` endpoint.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    endpoint: String,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &PredictionConfig) -> Self {
        Self {
            client,
            endpoint: config.predict_url(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictionError> {
        debug!(
            endpoint = %self.endpoint,
            features = request.len(),
            "requesting risk prediction"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| PredictionError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                text
            };
            warn!(status = status.as_u16(), "prediction service rejected request");
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|err| PredictionError::Decode(err.to_string()))
    }
}
