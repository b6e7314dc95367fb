//! Read-time normalization of persisted submissions.
//!
//! Records are never migrated. Every layout the intake form has written (answers under
//! `responses`, under `features.questionnaire`, or flat in `features`) is recognized here and
//! turned into one uniform [`RecordView`].

mod normalizer;
mod render;

pub use normalizer::{
    bucket_entries, created_at, created_at_millis, is_score_key, locate_answers, meta_number,
    meta_text, parse_timestamp, AnswerSource, Bucket, LocatedAnswers, NormalizedEntry, CODE_KEYS,
    LAT_KEYS, LNG_KEYS, NAME_KEYS,
};
pub use render::{
    display_risk_label, format_fixed, format_number, format_primitive, render_fields,
    render_value, RenderEntry, RenderNode, GROUPING_THRESHOLD, MAX_RENDER_DEPTH, PLACEHOLDER,
};

use serde::Serialize;
use serde_json::{Map, Value};

use super::catalog::QuestionCatalog;
use super::code::QuestionCode;
use super::domain::RecordId;
use super::repository::StoredSubmission;

/// Top-level document keys with a dedicated section in the view.
const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "ownerId",
    "uid",
    "meta",
    "features",
    "responses",
    "notes",
    "prediction",
    "createdAt",
];

/// One answer row with its choice label resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRow {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<QuestionCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
    pub value: Value,
    pub display: String,
}

impl AnswerRow {
    fn from_entry(catalog: &'static QuestionCatalog, entry: &NormalizedEntry<'_>) -> Self {
        let question = entry.code.and_then(|code| catalog.lookup(code));
        let label = question.and_then(|question| {
            let value = entry.value.as_f64().filter(|value| value.fract() == 0.0)?;
            let value = u8::try_from(value as i64).ok()?;
            question.choices.label_for(value)
        });

        Self {
            key: entry.key.clone(),
            code: entry.code,
            title: question.map(|question| question.title),
            value: entry.value.clone(),
            display: label
                .map(str::to_string)
                .unwrap_or_else(|| format_primitive(entry.value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerSection {
    pub bucket: Bucket,
    pub label: &'static str,
    pub rows: Vec<AnswerRow>,
}

/// Prediction block; tolerates missing fields and both version-key spellings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub score: Option<f64>,
    pub risk_index: String,
    pub risk_label: String,
    pub description: String,
    pub reasons: Vec<String>,
    pub model_version: String,
}

impl PredictionView {
    pub fn from_value(prediction: Option<&Value>) -> Self {
        let field = |key: &str| prediction.and_then(|prediction| prediction.get(key));

        let score = field("score")
            .and_then(Value::as_f64)
            .filter(|score| score.is_finite());
        let risk = field("risk").and_then(Value::as_str).unwrap_or_default();
        let reasons: Vec<String> = field("reasons")
            .and_then(Value::as_array)
            .map(|reasons| {
                reasons
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let model_version = field("model_version")
            .or_else(|| field("modelVersion"))
            .map(format_primitive)
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let risk_label = display_risk_label(risk);
        let description = if reasons.is_empty() {
            risk_label.clone()
        } else {
            reasons.join(" • ")
        };

        Self {
            score,
            risk_index: format_fixed(score, 3),
            risk_label,
            description,
            reasons,
            model_version,
        }
    }
}

/// Uniform rendering of one persisted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub id: RecordId,
    pub title: String,
    pub created_at: String,
    pub prediction: PredictionView,
    pub meta: Vec<RenderEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_source: Option<AnswerSource>,
    pub sections: Vec<AnswerSection>,
    pub notes: String,
    pub other_fields: Vec<RenderEntry>,
}

impl RecordView {
    pub fn from_stored(catalog: &'static QuestionCatalog, record: &StoredSubmission) -> Self {
        Self::from_document(catalog, record.id.clone(), &record.document)
    }

    pub fn from_document(catalog: &'static QuestionCatalog, id: RecordId, document: &Value) -> Self {
        let meta = document.get("meta").unwrap_or(&Value::Null);
        let title = match meta_text(meta, &NAME_KEYS) {
            Some(name) => format!("{name} — Details"),
            None => "Questionnaire details".to_string(),
        };

        let located = locate_answers(document);
        let sections = located
            .map(|located| {
                bucket_entries(located.entries)
                    .into_iter()
                    .map(|(bucket, entries)| AnswerSection {
                        bucket,
                        label: bucket.label(),
                        rows: entries
                            .iter()
                            .map(|entry| AnswerRow::from_entry(catalog, entry))
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let notes = match document.get("notes").and_then(Value::as_str) {
            Some(notes) if !notes.trim().is_empty() => notes.to_string(),
            _ => PLACEHOLDER.to_string(),
        };

        Self {
            id,
            title,
            created_at: created_at(document)
                .map(|stamp| stamp.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            prediction: PredictionView::from_value(document.get("prediction")),
            meta: meta.as_object().map(render_fields).unwrap_or_default(),
            answer_source: located.map(|located| located.source),
            sections,
            notes,
            other_fields: other_fields(document, located.map(|located| located.source)),
        }
    }

    pub fn section(&self, bucket: Bucket) -> Option<&AnswerSection> {
        self.sections.iter().find(|section| section.bucket == bucket)
    }

    /// Resolved row for a code, if the record answered it.
    pub fn answer(&self, code: QuestionCode) -> Option<&AnswerRow> {
        self.sections
            .iter()
            .flat_map(|section| section.rows.iter())
            .find(|row| row.code == Some(code))
    }
}

/// Fields outside the dedicated sections, rendered generically.
fn other_fields(document: &Value, source: Option<AnswerSource>) -> Vec<RenderEntry> {
    let Some(map) = document.as_object() else {
        return Vec::new();
    };

    let mut leftovers: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    // Flat features are already bucketed; elsewhere their siblings still need a home.
    if let Some(features) = document.get("features").and_then(Value::as_object) {
        match source {
            Some(AnswerSource::FlatFeatures) => {}
            Some(AnswerSource::Questionnaire) => {
                for (key, value) in features.iter().filter(|(key, _)| *key != "questionnaire") {
                    leftovers.insert(format!("features.{key}"), value.clone());
                }
            }
            Some(AnswerSource::Responses) | None => {
                if !features.is_empty() {
                    leftovers.insert("features".to_string(), Value::Object(features.clone()));
                }
            }
        }
    }

    render_fields(&leftovers)
}
