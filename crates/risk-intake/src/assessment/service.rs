use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use super::answers::AnswerSet;
use super::auth::Session;
use super::catalog::QuestionCatalog;
use super::code::QuestionCode;
use super::domain::{
    BuildingMeta, OwnerId, Prediction, RecordId, SubmissionDraft, SubmissionRequest,
    ValidationError,
};
use super::prediction::{PredictRequest, PredictionClient, PredictionError};
use super::repository::{RepositoryError, StoredSubmission, SubmissionStore};
use super::scoring::{DerivedScores, ScoreReport, ScoringEngine};
use super::summary::{SortState, SummaryList};
use super::viewer::RecordView;

/// Builds submission drafts for one signed-in owner. Performs no I/O.
#[derive(Debug, Clone)]
pub struct SubmissionAssembler<'a> {
    engine: ScoringEngine<'a>,
    owner: OwnerId,
}

impl<'a> SubmissionAssembler<'a> {
    pub fn new(engine: ScoringEngine<'a>, owner: OwnerId) -> Self {
        Self { engine, owner }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Validate metadata and completeness, then freeze the derived scores.
    pub fn assemble(
        &self,
        meta: BuildingMeta,
        answers: AnswerSet,
        notes: String,
    ) -> Result<SubmissionDraft, SubmissionError> {
        let meta = meta.trimmed();
        meta.validate()?;

        let missing = self.engine.missing_codes(&answers);
        if !missing.is_empty() {
            return Err(SubmissionError::IncompleteAnswers { missing });
        }

        let scores = self.engine.derive(&answers);
        Ok(SubmissionDraft {
            owner_id: self.owner.clone(),
            meta,
            answers,
            scores,
            notes: notes.trim().to_string(),
        })
    }
}

/// Outcome of a saved submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub id: RecordId,
    pub prediction: Prediction,
    pub scores: DerivedScores,
}

/// Service composing scoring, the prediction client, and the document store.
pub struct IntakeService<S, P> {
    engine: ScoringEngine<'static>,
    store: Arc<S>,
    predictor: Arc<P>,
    in_flight: Arc<Mutex<HashSet<OwnerId>>>,
}

impl<S, P> IntakeService<S, P>
where
    S: SubmissionStore + 'static,
    P: PredictionClient + 'static,
{
    pub fn new(store: Arc<S>, predictor: Arc<P>) -> Self {
        Self::with_catalog(QuestionCatalog::standard(), store, predictor)
    }

    pub fn with_catalog(
        catalog: &'static QuestionCatalog,
        store: Arc<S>,
        predictor: Arc<P>,
    ) -> Self {
        Self {
            engine: ScoringEngine::new(catalog),
            store,
            predictor,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn catalog(&self) -> &'static QuestionCatalog {
        self.engine.catalog()
    }

    /// Live recomputation for the form; no session or I/O involved.
    pub fn score(&self, answers: &AnswerSet) -> ScoreReport {
        self.engine.report(answers)
    }

    pub fn assembler(&self, session: &Session) -> SubmissionAssembler<'static> {
        SubmissionAssembler::new(self.engine, session.owner_id().clone())
    }

    /// Assemble, predict, then persist. At most one submission per owner runs at a time.
    pub async fn submit(
        &self,
        session: &Session,
        request: SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let owner = session.owner_id();
        let draft = self
            .assembler(session)
            .assemble(request.meta, request.answers, request.notes)
            .inspect_err(|err| info!(owner = %owner, error = %err, "submission rejected"))?;

        let _guard =
            InFlightGuard::acquire(&self.in_flight, owner).ok_or(SubmissionError::InFlight)?;

        let features = PredictRequest::new(self.engine.catalog(), &draft.answers, &draft.scores);
        let prediction = self
            .predictor
            .predict(&features)
            .await
            .inspect_err(|err| warn!(owner = %owner, error = %err, "prediction failed"))?;

        let scores = draft.scores;
        let document = draft.into_document(&prediction);
        let id = self
            .store
            .create(owner, document)
            .inspect_err(|err| warn!(owner = %owner, error = %err, "persisting submission failed"))
            .map_err(SubmissionError::Persistence)?;

        info!(
            owner = %owner,
            record = %id,
            risk = prediction.risk.as_str(),
            risk_index = scores.risk_index_0_10,
            "submission saved"
        );

        Ok(SubmissionReceipt {
            id,
            prediction,
            scores,
        })
    }

    /// Every record of the session owner, unordered.
    pub fn list(&self, session: &Session) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let records = self.store.query(session.owner_id())?;
        info!(owner = %session.owner_id(), records = records.len(), "listed submissions");
        Ok(records)
    }

    pub fn summary(
        &self,
        session: &Session,
        sort: Option<SortState>,
    ) -> Result<SummaryList, RepositoryError> {
        let list = SummaryList::from_records(&self.list(session)?);
        Ok(match sort {
            Some(sort) => list.sorted_by(sort),
            None => list,
        })
    }

    pub fn details(&self, session: &Session, id: &RecordId) -> Result<RecordView, RepositoryError> {
        let record = self
            .store
            .fetch(session.owner_id(), id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(RecordView::from_stored(self.engine.catalog(), &record))
    }
}

/// Marks an owner as having a submission in flight until dropped.
struct InFlightGuard {
    owners: Arc<Mutex<HashSet<OwnerId>>>,
    owner: OwnerId,
}

impl InFlightGuard {
    fn acquire(owners: &Arc<Mutex<HashSet<OwnerId>>>, owner: &OwnerId) -> Option<Self> {
        let inserted = owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner.clone());
        inserted.then(|| Self {
            owners: Arc::clone(owners),
            owner: owner.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Please answer every question ({} missing).", missing.len())]
    IncompleteAnswers { missing: Vec<QuestionCode> },
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error("Failed to save: {0}")]
    Persistence(#[source] RepositoryError),
    #[error("a submission is already in progress")]
    InFlight,
}

impl SubmissionError {
    /// Unanswered codes carried by an incomplete submission; empty otherwise.
    pub fn missing_codes(&self) -> &[QuestionCode] {
        match self {
            SubmissionError::IncompleteAnswers { missing } => missing,
            _ => &[],
        }
    }
}
