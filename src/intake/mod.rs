//! Meal-plan intake — the wizard that collects a user's profile, body
//! metrics and allergies and submits them to the meal-plan service.
//!
//! The `IntakeAggregator` holds the three slices. Steps read a slice to
//! pre-fill their drafts and write it back through the aggregator's merge
//! operations. The final step submits everything in one request.

pub mod aggregator;
pub mod model;
pub mod steps;
pub mod transport;

pub use aggregator::{IntakeAggregator, SubmissionReceipt};
pub use model::{
    ActivityFrequency, ActivityLevel, Gender, IdentityPatch, IdentityRecord, MetricsPatch,
    MetricsRecord, SubmissionPayload,
};
pub use steps::{AllergyDraft, IdentityDraft, IntakeStep, MetricsDraft, StepDriver};
pub use transport::{HttpTransport, SubmissionTransport, TransportResponse};
