use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::assessment::code::{QuestionCode, QuestionGroup};

/// Where a record kept its questionnaire answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Responses,
    Questionnaire,
    FlatFeatures,
}

impl AnswerSource {
    pub const fn path(self) -> &'static str {
        match self {
            AnswerSource::Responses => "responses",
            AnswerSource::Questionnaire => "features.questionnaire",
            AnswerSource::FlatFeatures => "features",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedAnswers<'a> {
    pub source: AnswerSource,
    pub entries: &'a Map<String, Value>,
}

type LayoutReader = (AnswerSource, fn(&Value) -> Option<&Map<String, Value>>);

// First match wins.
const ANSWER_LAYOUTS: [LayoutReader; 3] = [
    (AnswerSource::Responses, read_responses),
    (AnswerSource::Questionnaire, read_questionnaire),
    (AnswerSource::FlatFeatures, read_flat_features),
];

fn non_empty(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|map| !map.is_empty())
}

fn read_responses(document: &Value) -> Option<&Map<String, Value>> {
    non_empty(document.get("responses"))
}

fn read_questionnaire(document: &Value) -> Option<&Map<String, Value>> {
    non_empty(document.get("features").and_then(|features| features.get("questionnaire")))
}

fn read_flat_features(document: &Value) -> Option<&Map<String, Value>> {
    non_empty(document.get("features"))
        .filter(|features| features.keys().any(|key| QuestionCode::looks_like_code(key)))
}

/// Find the answer map of a persisted record, whatever layout wrote it.
pub fn locate_answers(document: &Value) -> Option<LocatedAnswers<'_>> {
    ANSWER_LAYOUTS.iter().find_map(|(source, read)| {
        read(document).map(|entries| LocatedAnswers {
            source: *source,
            entries,
        })
    })
}

/// Display section an answer-map key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Hazard,
    Exposure,
    Vulnerability,
    Scores,
    Other,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Hazard,
        Bucket::Exposure,
        Bucket::Vulnerability,
        Bucket::Scores,
        Bucket::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Bucket::Hazard => "Hazard",
            Bucket::Exposure => "Exposure",
            Bucket::Vulnerability => "Vulnerability",
            Bucket::Scores => "Scores",
            Bucket::Other => "Other",
        }
    }

    fn for_group(group: QuestionGroup) -> Self {
        match group {
            QuestionGroup::Hazard => Bucket::Hazard,
            QuestionGroup::Exposure => Bucket::Exposure,
            QuestionGroup::Vulnerability => Bucket::Vulnerability,
        }
    }
}

pub fn is_score_key(key: &str) -> bool {
    let upper = key.trim().to_ascii_uppercase();
    upper.ends_with("_SCORE") || upper.contains("RISK_INDEX")
}

/// One answer-map entry with its canonical key resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry<'a> {
    pub key: String,
    pub raw_key: &'a str,
    pub code: Option<QuestionCode>,
    pub bucket: Bucket,
    pub value: &'a Value,
}

impl<'a> NormalizedEntry<'a> {
    pub fn new(raw_key: &'a str, value: &'a Value) -> Self {
        match QuestionCode::parse(raw_key) {
            Some(code) => Self {
                key: code.to_string(),
                raw_key,
                code: Some(code),
                bucket: Bucket::for_group(code.group()),
                value,
            },
            None => Self {
                key: raw_key.trim().to_string(),
                raw_key,
                code: None,
                bucket: if is_score_key(raw_key) {
                    Bucket::Scores
                } else {
                    Bucket::Other
                },
                value,
            },
        }
    }

    fn is_canonical_spelling(&self) -> bool {
        self.raw_key == self.key
    }
}

/// Order by group rank, then major and minor, then the key text.
pub fn compare_entries(left: &NormalizedEntry<'_>, right: &NormalizedEntry<'_>) -> Ordering {
    let rank = |entry: &NormalizedEntry<'_>| {
        entry
            .code
            .map(|code| (code.group().rank(), code.major(), code.minor()))
    };
    match (rank(left), rank(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| left.key.cmp(&right.key))
}

/// Normalize, de-duplicate, and sort an answer map into display buckets.
///
/// When both spellings of a code are present the canonical one wins.
pub fn bucket_entries(entries: &Map<String, Value>) -> Vec<(Bucket, Vec<NormalizedEntry<'_>>)> {
    let mut normalized: Vec<NormalizedEntry<'_>> = entries
        .iter()
        .map(|(key, value)| NormalizedEntry::new(key, value))
        .collect();
    normalized.sort_by(|left, right| {
        compare_entries(left, right)
            .then_with(|| right.is_canonical_spelling().cmp(&left.is_canonical_spelling()))
    });

    let mut seen = HashSet::new();
    normalized.retain(|entry| seen.insert(entry.key.clone()));

    Bucket::ALL
        .into_iter()
        .filter_map(|bucket| {
            let members: Vec<_> = normalized
                .iter()
                .filter(|entry| entry.bucket == bucket)
                .cloned()
                .collect();
            (!members.is_empty()).then_some((bucket, members))
        })
        .collect()
}

pub const NAME_KEYS: [&str; 3] = ["buildingName", "building_name", "name"];
pub const CODE_KEYS: [&str; 4] = [
    "buildingUniqueCode",
    "building_unique_code",
    "uniqueCode",
    "code",
];
pub const LAT_KEYS: [&str; 4] = ["coordinatesLat", "coordinates_lat", "lat", "latitude"];
pub const LNG_KEYS: [&str; 4] = ["coordinatesLng", "coordinates_lng", "lng", "longitude"];

/// First non-blank text under any of the alias keys.
pub fn meta_text(meta: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match meta.get(alias)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// First finite number under any of the alias keys; numeric strings are accepted.
pub fn meta_number(meta: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|alias| match meta.get(alias)? {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        _ => None,
    })
}

/// Creation stamp from RFC 3339 text, epoch milliseconds, or a `{seconds, nanoseconds}` object.
pub fn created_at(document: &Value) -> Option<DateTime<Utc>> {
    parse_timestamp(document.get("createdAt")?)
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc)),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .and_then(|nanos| u32::try_from(nanos).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, nanos)
        }
        _ => None,
    }
}

/// Sort key for creation time; unreadable stamps sort as the epoch.
pub fn created_at_millis(document: &Value) -> i64 {
    created_at(document)
        .map(|stamp| stamp.timestamp_millis())
        .unwrap_or(0)
}
