use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::catalog::QuestionCatalog;
use super::code::QuestionCode;

/// A single answered value on the instrument's 1..=3 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnswerValue(u8);

impl AnswerValue {
    pub const MIN: AnswerValue = AnswerValue(1);
    pub const MID: AnswerValue = AnswerValue(2);
    pub const MAX: AnswerValue = AnswerValue(3);

    pub fn new(value: u8) -> Result<Self, InvalidAnswerValue> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidAnswerValue(value))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("answer value {0} is outside the 1-3 scale")]
pub struct InvalidAnswerValue(pub u8);

/// Immutable snapshot of questionnaire answers.
///
/// Every edit produces a new snapshot; the previous one is left untouched so derived scores
/// can always be recomputed from a consistent view. Unanswered items are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    values: Arc<BTreeMap<QuestionCode, AnswerValue>>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every catalog item answered with the same value.
    pub fn uniform(catalog: &QuestionCatalog, value: AnswerValue) -> Self {
        let values = catalog.codes().map(|code| (code, value)).collect();
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, code: QuestionCode) -> Option<AnswerValue> {
        self.values.get(&code).copied()
    }

    pub fn with_answer(&self, code: QuestionCode, value: AnswerValue) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.values).insert(code, value);
        next
    }

    pub fn without_answer(&self, code: QuestionCode) -> Self {
        if !self.values.contains_key(&code) {
            return self.clone();
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.values).remove(&code);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionCode, AnswerValue)> + '_ {
        self.values.iter().map(|(code, value)| (*code, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(QuestionCode, AnswerValue)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionCode, AnswerValue)>>(iter: T) -> Self {
        Self {
            values: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl Serialize for AnswerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (code, value) in self.values.iter() {
            map.serialize_entry(code, &value.get())?;
        }
        map.end()
    }
}

/// Accepts canonical or legacy keys; `null` marks an unanswered item.
///
/// When one item is spelled both ways the canonical spelling wins, whatever the key order.
impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<u8>>::deserialize(deserializer)?;
        let mut resolved: BTreeMap<QuestionCode, (bool, Option<u8>)> = BTreeMap::new();
        for (key, value) in raw {
            let code: QuestionCode = key.parse().map_err(de::Error::custom)?;
            let canonical = key == code.to_string();
            match resolved.get(&code) {
                Some((true, _)) => {}
                Some((false, _)) if !canonical => {}
                _ => {
                    resolved.insert(code, (canonical, value));
                }
            }
        }

        let mut values = BTreeMap::new();
        for (code, (_, value)) in resolved {
            if let Some(value) = value {
                let value = AnswerValue::new(value)
                    .map_err(|err| de::Error::custom(format!("{code}: {err}")))?;
                values.insert(code, value);
            }
        }
        Ok(Self {
            values: Arc::new(values),
        })
    }
}
