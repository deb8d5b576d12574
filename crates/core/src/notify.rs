use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::appraisal::AppraisalId;
use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Sent to the next approver when a level becomes pending.
    ReviewPending,
    /// Sent to the subject employee when the final approver signs off.
    ReviewCompleted,
    /// Sent to the subject employee when any level rejects.
    ReviewRejected,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReviewPending => "review_pending",
            Self::ReviewCompleted => "review_completed",
            Self::ReviewRejected => "review_rejected",
        }
    }
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Best-effort outbound notification channel. Failures are reported to the
/// caller, which logs and continues; delivery never gates a workflow
/// decision.
#[async_trait::async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        appraisal_id: &AppraisalId,
    ) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: EmployeeId,
    pub event: NotificationEvent,
    pub appraisal_id: AppraisalId,
}

#[derive(Clone, Default)]
pub struct InMemorySender {
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl InMemorySender {
    pub fn sent(&self) -> Vec<SentNotification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSender for InMemorySender {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        appraisal_id: &AppraisalId,
    ) -> Result<(), NotifyError> {
        let notification = SentNotification {
            recipient: recipient.clone(),
            event,
            appraisal_id: appraisal_id.clone(),
        };
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}

/// Sender that always fails; exercises the best-effort contract in tests.
#[derive(Clone, Debug, Default)]
pub struct FailingSender;

#[async_trait::async_trait]
impl NotificationSender for FailingSender {
    async fn notify(
        &self,
        _recipient: &EmployeeId,
        _event: NotificationEvent,
        _appraisal_id: &AppraisalId,
    ) -> Result<(), NotifyError> {
        Err(NotifyError("mail transport unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::appraisal::AppraisalId;
    use crate::domain::employee::EmployeeId;

    use super::{InMemorySender, NotificationEvent, NotificationSender};

    #[tokio::test]
    async fn in_memory_sender_records_deliveries_in_order() {
        let sender = InMemorySender::default();
        let appraisal_id = AppraisalId("APR-1".to_string());

        sender
            .notify(
                &EmployeeId("emp-s2".to_string()),
                NotificationEvent::ReviewPending,
                &appraisal_id,
            )
            .await
            .expect("notify");
        sender
            .notify(
                &EmployeeId("emp-e".to_string()),
                NotificationEvent::ReviewCompleted,
                &appraisal_id,
            )
            .await
            .expect("notify");

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].event, NotificationEvent::ReviewPending);
        assert_eq!(sent[0].recipient.0, "emp-s2");
        assert_eq!(sent[1].event, NotificationEvent::ReviewCompleted);
    }

    #[test]
    fn event_labels_are_stable() {
        assert_eq!(NotificationEvent::ReviewPending.as_str(), "review_pending");
        assert_eq!(NotificationEvent::ReviewCompleted.as_str(), "review_completed");
        assert_eq!(NotificationEvent::ReviewRejected.as_str(), "review_rejected");
    }
}
