use tracing::info;

use appraisy_core::domain::appraisal::AppraisalId;
use appraisy_core::domain::employee::EmployeeId;
use appraisy_core::notify::{NotificationEvent, NotificationSender, NotifyError};

use crate::templates::NotificationTemplates;

/// Mail-style notification sender that renders the message and hands it to
/// the log stream. Deployments that deliver real mail wrap an SMTP client
/// behind the same [`NotificationSender`] trait.
pub struct LoggingMailSender {
    templates: NotificationTemplates,
    from_address: String,
}

impl LoggingMailSender {
    pub fn new(from_address: impl Into<String>) -> Result<Self, tera::Error> {
        Ok(Self { templates: NotificationTemplates::new()?, from_address: from_address.into() })
    }
}

#[async_trait::async_trait]
impl NotificationSender for LoggingMailSender {
    async fn notify(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        appraisal_id: &AppraisalId,
    ) -> Result<(), NotifyError> {
        let rendered = self
            .templates
            .render(event, appraisal_id)
            .map_err(|e| NotifyError(format!("template render failed: {e}")))?;

        info!(
            event_name = "notification.dispatched",
            appraisal_id = %appraisal_id.0,
            recipient = %recipient.0,
            notification = event.as_str(),
            from = %self.from_address,
            subject = %rendered.subject,
            "notification dispatched"
        );
        Ok(())
    }
}
