mod policy;
mod rules;

pub use policy::{RiskBand, LOW_BAND_MAX, MODERATE_BAND_MAX};

use serde::{Deserialize, Serialize};

use super::answers::AnswerSet;
use super::catalog::QuestionCatalog;
use super::code::{QuestionCode, QuestionGroup};

/// Scores derived from an answer snapshot; frozen into the record at save time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedScores {
    #[serde(rename = "HAZARD_SCORE")]
    pub hazard_score: f64,
    #[serde(rename = "EXPOSURE_SCORE")]
    pub exposure_score: f64,
    #[serde(rename = "VULNERABILITY_SCORE")]
    pub vulnerability_score: f64,
    #[serde(rename = "RISK_INDEX_SUM")]
    pub risk_index_sum: f64,
    #[serde(rename = "RISK_INDEX_0_10")]
    pub risk_index_0_10: f64,
}

impl DerivedScores {
    pub const FIELD_NAMES: [&'static str; 5] = [
        "HAZARD_SCORE",
        "EXPOSURE_SCORE",
        "VULNERABILITY_SCORE",
        "RISK_INDEX_SUM",
        "RISK_INDEX_0_10",
    ];

    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            (Self::FIELD_NAMES[0], self.hazard_score),
            (Self::FIELD_NAMES[1], self.exposure_score),
            (Self::FIELD_NAMES[2], self.vulnerability_score),
            (Self::FIELD_NAMES[3], self.risk_index_sum),
            (Self::FIELD_NAMES[4], self.risk_index_0_10),
        ]
    }
}

/// Weighted group averages behind the composite index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupRatings {
    pub hazard: f64,
    pub exposure: f64,
    pub vulnerability: f64,
    pub risk_rating: f64,
}

/// Everything the form needs after an answer changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub scores: DerivedScores,
    pub ratings: GroupRatings,
    pub band: RiskBand,
    pub missing: Vec<QuestionCode>,
    pub complete: bool,
}

/// Pure scoring over a question catalog; cheap enough to run on every edit.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    catalog: &'a QuestionCatalog,
}

impl ScoringEngine<'static> {
    pub fn standard() -> Self {
        Self::new(QuestionCatalog::standard())
    }
}

impl<'a> ScoringEngine<'a> {
    pub fn new(catalog: &'a QuestionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a QuestionCatalog {
        self.catalog
    }

    pub fn weighted_sum(&self, answers: &AnswerSet, group: QuestionGroup) -> u32 {
        rules::weighted_sum(self.catalog.in_group(group), answers)
    }

    pub fn weighted_average(&self, answers: &AnswerSet, group: QuestionGroup) -> f64 {
        rules::weighted_average(self.catalog.in_group(group), answers)
    }

    pub fn ratings(&self, answers: &AnswerSet) -> GroupRatings {
        let hazard = self.weighted_average(answers, QuestionGroup::Hazard);
        let exposure = self.weighted_average(answers, QuestionGroup::Exposure);
        let vulnerability = self.weighted_average(answers, QuestionGroup::Vulnerability);
        let (risk_rating, _) = rules::composite_index(hazard, exposure, vulnerability);

        GroupRatings {
            hazard,
            exposure,
            vulnerability,
            risk_rating,
        }
    }

    pub fn derive(&self, answers: &AnswerSet) -> DerivedScores {
        let hazard_score = self.weighted_sum(answers, QuestionGroup::Hazard);
        let exposure_score = self.weighted_sum(answers, QuestionGroup::Exposure);
        let vulnerability_score = self.weighted_sum(answers, QuestionGroup::Vulnerability);
        let ratings = self.ratings(answers);
        let (_, risk_index_0_10) =
            rules::composite_index(ratings.hazard, ratings.exposure, ratings.vulnerability);

        DerivedScores {
            hazard_score: f64::from(hazard_score),
            exposure_score: f64::from(exposure_score),
            vulnerability_score: f64::from(vulnerability_score),
            risk_index_sum: f64::from(hazard_score + exposure_score + vulnerability_score),
            risk_index_0_10,
        }
    }

    /// Unanswered catalog codes, in catalog order.
    pub fn missing_codes(&self, answers: &AnswerSet) -> Vec<QuestionCode> {
        self.catalog
            .codes()
            .filter(|code| answers.get(*code).is_none())
            .collect()
    }

    pub fn is_complete(&self, answers: &AnswerSet) -> bool {
        self.catalog
            .codes()
            .all(|code| answers.get(code).is_some())
    }

    pub fn report(&self, answers: &AnswerSet) -> ScoreReport {
        let scores = self.derive(answers);
        let missing = self.missing_codes(answers);
        ScoreReport {
            scores,
            ratings: self.ratings(answers),
            band: RiskBand::from_index(scores.risk_index_0_10),
            complete: missing.is_empty(),
            missing,
        }
    }
}
