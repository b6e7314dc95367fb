//! Building risk assessment: questionnaire catalog, live scoring, submission, and review.
//!
//! Scoring is a pure function of an immutable answer snapshot. Submissions are assembled per
//! signed-in owner, classified by the remote prediction service, and stored once. Stored records
//! are read back through the viewer, which tolerates every document layout ever written.

pub mod answers;
pub mod auth;
pub mod catalog;
pub mod code;
pub mod domain;
pub mod prediction;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod summary;
pub mod viewer;

#[cfg(test)]
mod tests;

pub use answers::{AnswerSet, AnswerValue, InvalidAnswerValue};
pub use auth::{
    AuthError, AuthErrorCode, Credentials, CurrentUser, FederatedLogin, IdentityProvider,
    Session, SessionToken, SignupRequest, VerificationNotice, MIN_PASSWORD_LENGTH,
};
pub use catalog::{Choice, ChoiceSet, QuestionCatalog, QuestionInfo};
pub use code::{InvalidQuestionCode, QuestionCode, QuestionGroup};
pub use domain::{
    BuildingMeta, OwnerId, Prediction, RecordId, RequiredField, RiskLevel, SubmissionDraft,
    SubmissionRequest, ValidationError,
};
pub use prediction::{HttpPredictionClient, PredictRequest, PredictionClient, PredictionError};
pub use repository::{RepositoryError, StoredSubmission, SubmissionStore};
pub use router::{intake_router, IntakeState};
pub use scoring::{DerivedScores, GroupRatings, RiskBand, ScoreReport, ScoringEngine};
pub use service::{IntakeService, SubmissionAssembler, SubmissionError, SubmissionReceipt};
pub use summary::{SortDirection, SortKey, SortState, SummaryList, SummaryRow, SummaryRowView};
pub use viewer::{AnswerSource, Bucket, PredictionView, RecordView, RenderNode};
