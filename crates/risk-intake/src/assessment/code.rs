use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The three sections of the risk instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionGroup {
    Hazard,
    Exposure,
    Vulnerability,
}

impl QuestionGroup {
    pub const ALL: [QuestionGroup; 3] = [
        QuestionGroup::Hazard,
        QuestionGroup::Exposure,
        QuestionGroup::Vulnerability,
    ];

    pub const fn prefix(self) -> char {
        match self {
            QuestionGroup::Hazard => 'A',
            QuestionGroup::Exposure => 'B',
            QuestionGroup::Vulnerability => 'C',
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            QuestionGroup::Hazard => "Hazard",
            QuestionGroup::Exposure => "Exposure",
            QuestionGroup::Vulnerability => "Vulnerability",
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            QuestionGroup::Hazard => 0,
            QuestionGroup::Exposure => 1,
            QuestionGroup::Vulnerability => 2,
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'A' => Some(QuestionGroup::Hazard),
            'B' => Some(QuestionGroup::Exposure),
            'C' => Some(QuestionGroup::Vulnerability),
            _ => None,
        }
    }
}

/// Canonical `<Group><major>.<minor>` key of a questionnaire item.
///
/// Parsing accepts the dotted form (`A1.2`) as well as the underscore keys written by
/// older intake builds (`A1_2_FAULT_DISTANCE`); both yield the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionCode {
    group: QuestionGroup,
    major: u8,
    minor: u8,
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([ABCabc])(\d{1,3})[._](\d{1,3})(?:_[A-Za-z0-9_]*)?\s*$")
            .expect("question code pattern compiles")
    })
}

impl QuestionCode {
    pub const fn new(group: QuestionGroup, major: u8, minor: u8) -> Self {
        Self {
            group,
            major,
            minor,
        }
    }

    /// Parse a canonical or legacy key, returning `None` for anything that is not a code.
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = code_pattern().captures(raw)?;
        let group = captures
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(QuestionGroup::from_prefix)?;
        let major = captures.get(2)?.as_str().parse().ok()?;
        let minor = captures.get(3)?.as_str().parse().ok()?;
        Some(Self::new(group, major, minor))
    }

    /// True when a record key is shaped like a questionnaire code in either encoding.
    pub fn looks_like_code(raw: &str) -> bool {
        Self::parse(raw).is_some()
    }

    pub const fn group(&self) -> QuestionGroup {
        self.group
    }

    pub const fn major(&self) -> u8 {
        self.major
    }

    pub const fn minor(&self) -> u8 {
        self.minor
    }
}

impl fmt::Display for QuestionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.group.prefix(), self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a questionnaire code")]
pub struct InvalidQuestionCode(pub String);

impl FromStr for QuestionCode {
    type Err = InvalidQuestionCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidQuestionCode(s.to_string()))
    }
}

impl Serialize for QuestionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuestionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
