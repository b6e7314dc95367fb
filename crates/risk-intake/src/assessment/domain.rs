use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::answers::AnswerSet;
use super::scoring::DerivedScores;

/// Identifier of the signed-in user owning a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned identifier of a persisted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifying and location attributes of the assessed structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingMeta {
    #[serde(default)]
    pub building_name: String,
    #[serde(default)]
    pub building_unique_code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates_lat: Option<f64>,
    #[serde(default)]
    pub coordinates_lng: Option<f64>,
    #[serde(default)]
    pub building_type: String,
    #[serde(default)]
    pub building_lot: String,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub number_of_storeys: Option<u32>,
}

impl BuildingMeta {
    /// Trim every text attribute.
    pub fn trimmed(self) -> Self {
        Self {
            building_name: self.building_name.trim().to_string(),
            building_unique_code: self.building_unique_code.trim().to_string(),
            address: self.address.trim().to_string(),
            building_type: self.building_type.trim().to_string(),
            building_lot: self.building_lot.trim().to_string(),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.building_name.trim().is_empty() {
            return Err(ValidationError::MissingField(RequiredField::BuildingName));
        }
        if self.building_unique_code.trim().is_empty() {
            return Err(ValidationError::MissingField(
                RequiredField::BuildingUniqueCode,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    BuildingName,
    BuildingUniqueCode,
}

impl RequiredField {
    pub const fn label(self) -> &'static str {
        match self {
            RequiredField::BuildingName => "Building Name",
            RequiredField::BuildingUniqueCode => "Building Unique Code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} is required.", .0.label())]
    MissingField(RequiredField),
}

/// Risk class assigned by the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Label shown to users; the service still says MEDIUM on the wire.
    pub const fn display_label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Stored copy of the prediction service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub score: f64,
    pub risk: RiskLevel,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub model_version: String,
}

/// Form payload: building metadata, raw answers, and free-text notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub meta: BuildingMeta,
    pub answers: AnswerSet,
    #[serde(default)]
    pub notes: String,
}

/// A validated, fully scored submission waiting for its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionDraft {
    pub owner_id: OwnerId,
    pub meta: BuildingMeta,
    pub answers: AnswerSet,
    pub scores: DerivedScores,
    pub notes: String,
}

impl SubmissionDraft {
    /// Answers keyed by canonical code followed by the derived score fields.
    pub fn questionnaire(&self) -> Map<String, Value> {
        let mut questionnaire: Map<String, Value> = self
            .answers
            .iter()
            .map(|(code, value)| (code.to_string(), Value::from(value.get())))
            .collect();
        for (name, value) in self.scores.fields() {
            questionnaire.insert(name.to_string(), json!(value));
        }
        questionnaire
    }

    /// Persisted document shape; the store adds the id and the creation stamp.
    pub fn into_document(self, prediction: &Prediction) -> Value {
        let questionnaire = self.questionnaire();
        json!({
            "ownerId": self.owner_id,
            "meta": self.meta,
            "features": { "questionnaire": questionnaire },
            "notes": self.notes,
            "prediction": prediction,
        })
    }
}
