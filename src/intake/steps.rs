//! Step sequence — the linear wizard driving the aggregator.
//!
//! Progresses: Identity → Allergies → Metrics → Review → Submitted.
//! Each data step either proceeds (validate, write its slice once, advance)
//! or skips (advance without writing). Going back never writes or clears.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::StepError;

use super::aggregator::{IntakeAggregator, SubmissionReceipt};
use super::model::{
    ActivityLevel, Gender, IdentityPatch, IdentityRecord, MetricsPatch, MetricsRecord,
};

/// The steps of the intake wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeStep {
    #[default]
    Identity,
    Allergies,
    Metrics,
    Review,
    Submitted,
}

impl IntakeStep {
    /// The step after this one, if any.
    pub fn next(&self) -> Option<IntakeStep> {
        use IntakeStep::*;
        match self {
            Identity => Some(Allergies),
            Allergies => Some(Metrics),
            Metrics => Some(Review),
            Review => Some(Submitted),
            Submitted => None,
        }
    }

    /// The step before this one. Nothing precedes Identity, and a finished
    /// session cannot be re-entered.
    pub fn previous(&self) -> Option<IntakeStep> {
        use IntakeStep::*;
        match self {
            Identity | Submitted => None,
            Allergies => Some(Identity),
            Metrics => Some(Allergies),
            Review => Some(Metrics),
        }
    }

    /// Whether the step may be skipped without entering data.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Identity | Self::Allergies | Self::Metrics)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// 1-based position for progress display.
    pub fn position(&self) -> usize {
        match self {
            Self::Identity => 1,
            Self::Allergies => 2,
            Self::Metrics => 3,
            Self::Review | Self::Submitted => 4,
        }
    }
}

impl std::fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::Allergies => "allergies",
            Self::Metrics => "metrics",
            Self::Review => "review",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}

/// Local edits on the identity step, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityDraft {
    pub name: String,
    pub age: String,
    pub gender: Option<Gender>,
}

impl IdentityDraft {
    /// Pre-fill from the stored record. Unset sentinels become blank fields.
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self {
            name: record.name.clone(),
            age: if record.age == 0 {
                String::new()
            } else {
                record.age.to_string()
            },
            gender: (record.age != 0 || !record.name.is_empty()).then_some(record.gender),
        }
    }

    /// All fields filled and the age a whole number.
    pub fn validate(&self) -> Result<IdentityPatch, StepError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StepError::Incomplete { field: "name" });
        }
        let age = self.age.trim();
        if age.is_empty() {
            return Err(StepError::Incomplete { field: "age" });
        }
        let age: u32 = age.parse().map_err(|_| StepError::InvalidNumber {
            field: "age",
            value: self.age.clone(),
        })?;
        let gender = self.gender.ok_or(StepError::Incomplete { field: "gender" })?;

        Ok(IdentityPatch::default()
            .with_name(name)
            .with_age(age)
            .with_gender(gender))
    }
}

/// Local edits on the allergy step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllergyDraft {
    pub entries: Vec<String>,
}

impl AllergyDraft {
    pub fn from_list(list: &[String]) -> Self {
        Self {
            entries: list.to_vec(),
        }
    }

    /// Parse a comma-separated line such as `"peanuts, shellfish"`.
    pub fn from_line(line: &str) -> Self {
        Self {
            entries: line.split(',').map(str::to_string).collect(),
        }
    }

    /// Trimmed, non-blank entries with duplicates removed, first one kept.
    pub fn normalized(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let entry = entry.trim();
            if entry.is_empty() || out.iter().any(|e| e.eq_ignore_ascii_case(entry)) {
                continue;
            }
            out.push(entry.to_string());
        }
        out
    }
}

/// Local edits on the metrics step, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsDraft {
    pub current_weight: String,
    pub height: String,
    pub target_weight: String,
    pub activity: ActivityLevel,
}

impl MetricsDraft {
    pub fn from_record(record: &MetricsRecord) -> Self {
        fn text(v: f64) -> String {
            if v == 0.0 { String::new() } else { v.to_string() }
        }
        Self {
            current_weight: text(record.current_weight),
            height: text(record.height),
            target_weight: text(record.target_weight),
            activity: ActivityLevel::from_frequency(record.activity_frequency),
        }
    }

    /// Every measurement must be a positive number.
    pub fn validate(&self) -> Result<MetricsPatch, StepError> {
        let current_weight = positive("current_weight", &self.current_weight)?;
        let height = positive("height", &self.height)?;
        let target_weight = positive("target_weight", &self.target_weight)?;
        Ok(MetricsPatch::default()
            .with_current_weight(current_weight)
            .with_height(height)
            .with_target_weight(target_weight)
            .with_activity(self.activity.frequency()))
    }
}

fn positive(field: &'static str, raw: &str) -> Result<f64, StepError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StepError::Incomplete { field });
    }
    // Accept a decimal comma as typed on some keyboards.
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| StepError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(StepError::InvalidNumber {
            field,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

/// Walks the user through the steps, writing each slice to the aggregator.
pub struct StepDriver {
    aggregator: Arc<IntakeAggregator>,
    current: IntakeStep,
}

impl StepDriver {
    pub fn new(aggregator: Arc<IntakeAggregator>) -> Self {
        Self {
            aggregator,
            current: IntakeStep::default(),
        }
    }

    pub fn current(&self) -> IntakeStep {
        self.current
    }

    pub fn aggregator(&self) -> &Arc<IntakeAggregator> {
        &self.aggregator
    }

    pub async fn identity_draft(&self) -> IdentityDraft {
        IdentityDraft::from_record(&self.aggregator.identity().await)
    }

    pub async fn allergy_draft(&self) -> AllergyDraft {
        AllergyDraft::from_list(&self.aggregator.allergies().await)
    }

    pub async fn metrics_draft(&self) -> MetricsDraft {
        MetricsDraft::from_record(&self.aggregator.metrics().await)
    }

    /// Validate the identity draft, store it, advance.
    ///
    /// Refuses to proceed until the auth provider has supplied the token.
    pub async fn proceed_identity(&mut self, draft: &IdentityDraft) -> Result<IntakeStep, StepError> {
        self.expect(IntakeStep::Identity, "proceed_identity")?;
        let patch = draft.validate()?;
        if !self.aggregator.has_identity_token().await {
            return Err(StepError::Unauthenticated);
        }
        self.aggregator.update_identity(patch).await;
        Ok(self.advance())
    }

    /// Store the normalized allergy list, advance.
    pub async fn proceed_allergies(&mut self, draft: &AllergyDraft) -> Result<IntakeStep, StepError> {
        self.expect(IntakeStep::Allergies, "proceed_allergies")?;
        self.aggregator.replace_allergies(draft.normalized()).await;
        Ok(self.advance())
    }

    /// Validate the metrics draft, store it, advance.
    pub async fn proceed_metrics(&mut self, draft: &MetricsDraft) -> Result<IntakeStep, StepError> {
        self.expect(IntakeStep::Metrics, "proceed_metrics")?;
        let patch = draft.validate()?;
        self.aggregator.update_metrics(patch).await;
        Ok(self.advance())
    }

    /// Advance without validating or storing anything.
    pub fn skip(&mut self) -> Result<IntakeStep, StepError> {
        if !self.current.is_skippable() {
            return Err(self.wrong_step("skip"));
        }
        debug!(step = %self.current, "Step skipped");
        Ok(self.advance())
    }

    /// Go back one step. Stored state is kept.
    pub fn back(&mut self) -> Result<IntakeStep, StepError> {
        let previous = self.current.previous().ok_or_else(|| self.wrong_step("back"))?;
        debug!(from = %self.current, to = %previous, "Step back");
        self.current = previous;
        Ok(previous)
    }

    /// Submit from the review step. On failure the driver stays on review.
    pub async fn finish(&mut self) -> Result<SubmissionReceipt, StepError> {
        self.expect(IntakeStep::Review, "finish")?;
        let receipt = self.aggregator.submit().await?;
        self.advance();
        info!(session_id = %receipt.session_id, "Intake complete");
        Ok(receipt)
    }

    fn expect(&self, step: IntakeStep, operation: &'static str) -> Result<(), StepError> {
        if self.current == step {
            Ok(())
        } else {
            Err(self.wrong_step(operation))
        }
    }

    fn wrong_step(&self, operation: &'static str) -> StepError {
        StepError::WrongStep {
            operation,
            step: self.current.to_string(),
        }
    }

    fn advance(&mut self) -> IntakeStep {
        if let Some(next) = self.current.next() {
            debug!(from = %self.current, to = %next, "Step advanced");
            self.current = next;
        }
        self.current
    }
}
