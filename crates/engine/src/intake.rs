//! Intake run state.
//!
//! Tracks one applicant's registration for a service through
//! `CollectingAnswers -> SupplyingDocuments -> AwaitingPayment -> Confirmed`.
//! The run owns the answer set and the supplied document ids; the catalog is
//! borrowed configuration. Every change is recorded as a timestamped
//! [`IntakeEvent`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use intake_types::{
    AnswerSet, AnswerValue, CategorizedDocuments, CheckoutOutcome, CheckoutReceipt, DocumentRequirement, DocumentValidation,
    ServiceCatalog,
};
use tracing::info;

use crate::documents::{group_by_category, outstanding_documents, render_checklist, resolve_required, validate};

/// Stage of an intake run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    CollectingAnswers,
    SupplyingDocuments,
    AwaitingPayment,
    Confirmed,
}

/// Structured record of a change to an intake run.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeEvent {
    AnswerRecorded { field: String, at: DateTime<Utc> },
    DocumentSupplied { document_id: String, at: DateTime<Utc> },
    StageChanged { from: IntakeStage, to: IntakeStage, at: DateTime<Utc> },
    CheckoutFinished { outcome: CheckoutOutcome, at: DateTime<Utc> },
}

/// Mutable state for one applicant's intake.
#[derive(Debug, Clone)]
pub struct IntakeRun<'catalog> {
    catalog: &'catalog ServiceCatalog,
    answers: AnswerSet,
    uploaded: HashSet<String>,
    stage: IntakeStage,
    receipt: Option<CheckoutReceipt>,
    events: Vec<IntakeEvent>,
}

impl<'catalog> IntakeRun<'catalog> {
    pub fn new(catalog: &'catalog ServiceCatalog) -> Self {
        Self {
            catalog,
            answers: AnswerSet::new(),
            uploaded: HashSet::new(),
            stage: IntakeStage::CollectingAnswers,
            receipt: None,
            events: Vec::new(),
        }
    }

    pub fn stage(&self) -> IntakeStage {
        self.stage
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn events(&self) -> &[IntakeEvent] {
        &self.events
    }

    /// Payment references from a successful checkout.
    pub fn receipt(&self) -> Option<&CheckoutReceipt> {
        self.receipt.as_ref()
    }

    /// Records an answer. Ignored once the run has moved past document collection.
    pub fn set_answer(&mut self, field: impl Into<String>, value: impl Into<AnswerValue>) {
        if self.is_locked() {
            return;
        }
        let field = field.into();
        self.answers.insert(field.clone(), value.into());
        self.events.push(IntakeEvent::AnswerRecorded { field, at: Utc::now() });
    }

    /// Finishes answering and moves on to supplying documents.
    pub fn finish_answers(&mut self) {
        if self.stage == IntakeStage::CollectingAnswers {
            self.transition(IntakeStage::SupplyingDocuments);
        }
    }

    /// Marks a document as supplied.
    pub fn mark_uploaded(&mut self, document_id: impl Into<String>) {
        if self.is_locked() {
            return;
        }
        let document_id = document_id.into();
        if self.uploaded.insert(document_id.clone()) {
            self.events.push(IntakeEvent::DocumentSupplied { document_id, at: Utc::now() });
        }
    }

    /// Requirements that apply to the current answers.
    pub fn required_documents(&self) -> Vec<DocumentRequirement> {
        resolve_required(&self.catalog.required_documents, &self.answers)
    }

    /// Requirements grouped for display.
    pub fn categorized_documents(&self) -> Vec<CategorizedDocuments> {
        group_by_category(&self.required_documents(), &self.catalog.document_categories)
    }

    pub fn checklist(&self) -> String {
        render_checklist(&self.categorized_documents())
    }

    /// Applicable requirements not supplied yet.
    pub fn outstanding(&self) -> Vec<DocumentRequirement> {
        outstanding_documents(&self.required_documents(), &self.uploaded)
    }

    /// Submission-time check of supplied documents against the whole catalog.
    pub fn validation(&self) -> DocumentValidation {
        validate(&self.catalog.required_documents, &self.uploaded)
    }

    /// Submits the supplied documents. Advances to `AwaitingPayment` when the
    /// validation passes; otherwise returns the failed validation and stays put.
    pub fn submit_documents(&mut self) -> Result<(), DocumentValidation> {
        if self.stage == IntakeStage::CollectingAnswers {
            self.transition(IntakeStage::SupplyingDocuments);
        }
        if self.stage != IntakeStage::SupplyingDocuments {
            return Ok(());
        }
        let validation = self.validation();
        if !validation.ok {
            return Err(validation);
        }
        self.transition(IntakeStage::AwaitingPayment);
        Ok(())
    }

    /// Applies a checkout outcome. Only success advances the run; cancellation
    /// and silent closure leave it awaiting payment.
    pub fn record_checkout(&mut self, outcome: CheckoutOutcome) {
        if self.stage != IntakeStage::AwaitingPayment {
            return;
        }
        self.events.push(IntakeEvent::CheckoutFinished {
            outcome: outcome.clone(),
            at: Utc::now(),
        });
        if let CheckoutOutcome::Success(receipt) = outcome {
            self.receipt = Some(receipt);
            self.transition(IntakeStage::Confirmed);
        }
    }

    fn is_locked(&self) -> bool {
        matches!(self.stage, IntakeStage::AwaitingPayment | IntakeStage::Confirmed)
    }

    fn transition(&mut self, to: IntakeStage) {
        let from = self.stage;
        self.stage = to;
        info!(service = ?self.catalog.service, ?from, ?to, "intake stage changed");
        self.events.push(IntakeEvent::StageChanged { from, to, at: Utc::now() });
    }
}
