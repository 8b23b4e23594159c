//! IntakeAggregator — the shared intake state for one wizard session.
//!
//! Each step updates only its own slice. `submit` reads all three slices
//! once and sends them as a single payload.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SubmitError;

use super::model::{
    IdentityPatch, IdentityRecord, MetricsPatch, MetricsRecord, SubmissionPayload,
};
use super::transport::SubmissionTransport;

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub session_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: u16,
    /// Decoded response body, not interpreted further.
    pub response: serde_json::Value,
}

/// Accumulates the identity, metrics and allergy slices for one session.
///
/// Constructed once at session start and shared by handle with every step.
pub struct IntakeAggregator {
    session_id: Uuid,
    identity: RwLock<IdentityRecord>,
    metrics: RwLock<MetricsRecord>,
    allergies: RwLock<Vec<String>>,
    transport: Arc<dyn SubmissionTransport>,
}

impl IntakeAggregator {
    /// Start a session with every slice at its default.
    pub fn new(transport: Arc<dyn SubmissionTransport>) -> Arc<Self> {
        let session_id = Uuid::new_v4();
        debug!(%session_id, endpoint = transport.endpoint(), "Intake session started");
        Arc::new(Self {
            session_id,
            identity: RwLock::new(IdentityRecord::default()),
            metrics: RwLock::new(MetricsRecord::default()),
            allergies: RwLock::new(Vec::new()),
            transport,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Merge the provided identity fields into the stored record.
    pub async fn update_identity(&self, patch: IdentityPatch) {
        let mut identity = self.identity.write().await;
        identity.merge(patch);
        debug!(session_id = %self.session_id, "Identity updated");
    }

    /// Merge the provided metrics fields into the stored record.
    pub async fn update_metrics(&self, patch: MetricsPatch) {
        let mut metrics = self.metrics.write().await;
        metrics.merge(patch);
        debug!(session_id = %self.session_id, "Metrics updated");
    }

    /// Replace the allergy list wholesale. Empty means none declared.
    pub async fn replace_allergies(&self, allergies: Vec<String>) {
        let count = allergies.len();
        *self.allergies.write().await = allergies;
        debug!(session_id = %self.session_id, count, "Allergies replaced");
    }

    pub async fn identity(&self) -> IdentityRecord {
        self.identity.read().await.clone()
    }

    pub async fn metrics(&self) -> MetricsRecord {
        self.metrics.read().await.clone()
    }

    pub async fn allergies(&self) -> Vec<String> {
        self.allergies.read().await.clone()
    }

    /// Whether the auth provider has supplied a real identity token.
    pub async fn has_identity_token(&self) -> bool {
        self.identity.read().await.has_token()
    }

    /// Consistent copy of all three slices.
    pub async fn snapshot(&self) -> SubmissionPayload {
        let user = self.identity.read().await.clone();
        let form = self.metrics.read().await.clone();
        let allergies = self.allergies.read().await.clone();
        SubmissionPayload {
            user,
            form,
            allergies,
        }
    }

    /// Send the current snapshot to the meal-plan service.
    ///
    /// One request per call, never retried here. Stored state is left as is
    /// on every outcome so the caller can call again.
    pub async fn submit(&self) -> Result<SubmissionReceipt, SubmitError> {
        let payload = self.snapshot().await;
        // Encode straight from the struct so the wire keeps field order.
        let body = serde_json::to_vec(&payload)?;

        info!(
            session_id = %self.session_id,
            endpoint = self.transport.endpoint(),
            allergies = payload.allergies.len(),
            "Submitting meal plan intake"
        );

        match self.transport.post_json(body).await {
            Ok(resp) => {
                info!(session_id = %self.session_id, status = resp.status, "Submission accepted");
                debug!(session_id = %self.session_id, response = %resp.body, "Submission response");
                Ok(SubmissionReceipt {
                    session_id: self.session_id,
                    submitted_at: Utc::now(),
                    status: resp.status,
                    response: resp.body,
                })
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    kind = %e.kind(),
                    "Submission failed: {}",
                    e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SubmitFailureKind;
    use crate::intake::model::{ActivityFrequency, Gender, PLACEHOLDER_USER_ID};
    use crate::intake::transport::TransportResponse;

    /// What the stub transport answers with.
    #[derive(Clone)]
    pub(crate) enum Reply {
        Ok(serde_json::Value),
        Unreachable,
        Status(u16),
        NotJson,
    }

    /// Records every body it is handed and answers with a fixed reply.
    pub(crate) struct StubTransport {
        reply: Reply,
        sent: Mutex<Vec<String>>,
    }

    impl StubTransport {
        pub(crate) fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
            })
        }

        /// Raw bodies, in send order.
        pub(crate) fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub(crate) fn sent_json(&self) -> Vec<serde_json::Value> {
            self.sent()
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl SubmissionTransport for StubTransport {
        fn endpoint(&self) -> &str {
            "stub://meal-plan"
        }

        async fn post_json(&self, body: Vec<u8>) -> Result<TransportResponse, SubmitError> {
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8(body).unwrap());
            match &self.reply {
                Reply::Ok(v) => Ok(TransportResponse {
                    status: 200,
                    body: v.clone(),
                }),
                Reply::Unreachable => Err(SubmitError::Transport {
                    endpoint: self.endpoint().to_string(),
                    reason: "connection refused".to_string(),
                }),
                Reply::Status(code) => Err(SubmitError::Status {
                    status: *code,
                    body: "server error".to_string(),
                }),
                Reply::NotJson => Err(SubmitError::Decode {
                    reason: "expected value at line 1 column 1".to_string(),
                }),
            }
        }
    }

    async fn filled(agg: &IntakeAggregator) {
        agg.update_identity(
            IdentityPatch::default()
                .with_name("Ayşe")
                .with_age(28)
                .with_gender(Gender::Female)
                .with_token("u_1"),
        )
        .await;
        agg.update_metrics(
            MetricsPatch::default()
                .with_current_weight(70.0)
                .with_height(165.0)
                .with_target_weight(60.0)
                .with_activity(ActivityFrequency::Moderate),
        )
        .await;
        agg.replace_allergies(vec!["peanuts".into(), "shellfish".into()])
            .await;
    }

    #[tokio::test]
    async fn starts_with_defaults() {
        let agg = IntakeAggregator::new(StubTransport::new(Reply::Ok(serde_json::json!({}))));
        let identity = agg.identity().await;
        assert!(identity.name.is_empty());
        assert_eq!(identity.age, 0);
        assert_eq!(identity.gender, Gender::Male);
        assert_eq!(identity.clerk_user_id, PLACEHOLDER_USER_ID);
        assert_eq!(agg.metrics().await, MetricsRecord::default());
        assert!(agg.allergies().await.is_empty());
        assert!(!agg.has_identity_token().await);
    }

    #[tokio::test]
    async fn merges_accumulate() {
        let agg = IntakeAggregator::new(StubTransport::new(Reply::Ok(serde_json::json!({}))));
        agg.update_identity(IdentityPatch::default().with_age(30)).await;
        agg.update_identity(IdentityPatch::default().with_name("X")).await;
        let identity = agg.identity().await;
        assert_eq!(identity.age, 30);
        assert_eq!(identity.name, "X");
    }

    #[tokio::test]
    async fn slices_are_isolated() {
        let agg = IntakeAggregator::new(StubTransport::new(Reply::Ok(serde_json::json!({}))));
        agg.replace_allergies(vec!["gluten".into()]).await;
        agg.update_metrics(MetricsPatch::default().with_height(172.0)).await;
        agg.update_identity(IdentityPatch::default().with_name("Deniz")).await;

        assert_eq!(agg.allergies().await, vec!["gluten".to_string()]);
        assert_eq!(agg.metrics().await.height, 172.0);
        assert_eq!(agg.metrics().await.current_weight, 0.0);
        assert_eq!(agg.identity().await.age, 0);
    }

    #[tokio::test]
    async fn allergies_replace_not_append() {
        let agg = IntakeAggregator::new(StubTransport::new(Reply::Ok(serde_json::json!({}))));
        agg.replace_allergies(vec!["nuts".into()]).await;
        agg.replace_allergies(Vec::new()).await;
        assert!(agg.allergies().await.is_empty());
    }

    #[tokio::test]
    async fn late_token_survives_later_identity_updates() {
        let agg = IntakeAggregator::new(StubTransport::new(Reply::Ok(serde_json::json!({}))));
        agg.update_identity(IdentityPatch::token("u_9")).await;
        agg.update_identity(IdentityPatch::default().with_name("Ece").with_token(""))
            .await;
        agg.update_identity(IdentityPatch::token(PLACEHOLDER_USER_ID)).await;
        let identity = agg.identity().await;
        assert_eq!(identity.clerk_user_id, "u_9");
        assert_eq!(identity.name, "Ece");
    }

    #[tokio::test]
    async fn submit_sends_exact_body_once() {
        let transport = StubTransport::new(Reply::Ok(serde_json::json!({"ok": true})));
        let agg = IntakeAggregator::new(transport.clone());
        filled(&agg).await;

        let receipt = agg.submit().await.unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.response["ok"], true);
        assert_eq!(receipt.session_id, agg.session_id());

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            r#"{"user":{"name":"Ayşe","age":28,"gender":"female","clerk_user_id":"u_1"},"form":{"current_weight":70,"height":165,"target_weight":60,"activity_frequency":"moderate"},"allergies":["peanuts","shellfish"]}"#
        );
    }

    #[tokio::test]
    async fn submit_with_defaults_is_well_formed() {
        let transport = StubTransport::new(Reply::Ok(serde_json::json!(null)));
        let agg = IntakeAggregator::new(transport.clone());
        agg.submit().await.unwrap();

        let body = &transport.sent_json()[0];
        assert_eq!(body["user"]["name"], "");
        assert_eq!(body["user"]["age"], 0);
        assert_eq!(body["user"]["gender"], "male");
        assert_eq!(body["user"]["clerk_user_id"], PLACEHOLDER_USER_ID);
        assert_eq!(body["form"]["current_weight"], 0);
        assert_eq!(body["form"]["height"], 0);
        assert_eq!(body["form"]["target_weight"], 0);
        assert_eq!(body["form"]["activity_frequency"], "moderate");
        assert_eq!(body["allergies"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn failures_are_classified_and_state_kept() {
        let cases = [
            (Reply::Unreachable, SubmitFailureKind::Transport),
            (Reply::Status(500), SubmitFailureKind::Status),
            (Reply::NotJson, SubmitFailureKind::Decode),
        ];
        for (reply, expected) in cases {
            let transport = StubTransport::new(reply);
            let agg = IntakeAggregator::new(transport.clone());
            filled(&agg).await;
            let before = agg.snapshot().await;

            let err = agg.submit().await.unwrap_err();
            assert_eq!(err.kind(), expected);
            assert_eq!(agg.snapshot().await, before, "state changed after {expected} failure");
        }
    }

    #[tokio::test]
    async fn each_submit_is_a_fresh_attempt() {
        let transport = StubTransport::new(Reply::Status(502));
        let agg = IntakeAggregator::new(transport.clone());
        assert!(agg.submit().await.is_err());
        assert!(agg.submit().await.is_err());
        assert_eq!(transport.sent().len(), 2);
    }
}
