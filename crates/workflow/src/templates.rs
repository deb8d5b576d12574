use tera::{Context, Tera};

use appraisy_core::domain::appraisal::AppraisalId;
use appraisy_core::notify::NotificationEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedNotification {
    pub subject: String,
    pub body: String,
}

/// Notification message bodies, rendered from embedded templates so the
/// wording lives in one place.
#[derive(Clone)]
pub struct NotificationTemplates {
    tera: Tera,
}

impl NotificationTemplates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "review_pending.txt",
            "Appraisal {{ appraisal_id }} is waiting for your review.\n\
             Please open your review inbox and record a decision.",
        )?;
        tera.add_raw_template(
            "review_completed.txt",
            "Your appraisal {{ appraisal_id }} has completed review.\n\
             The final grade and score are available on your appraisal page.",
        )?;
        tera.add_raw_template(
            "review_rejected.txt",
            "Your appraisal {{ appraisal_id }} was returned for revision.\n\
             Review the approver comments, update your self-assessment, and resubmit.",
        )?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        event: NotificationEvent,
        appraisal_id: &AppraisalId,
    ) -> Result<RenderedNotification, tera::Error> {
        let mut context = Context::new();
        context.insert("appraisal_id", &appraisal_id.0);

        let (template, subject) = match event {
            NotificationEvent::ReviewPending => {
                ("review_pending.txt", format!("Appraisal {} pending your review", appraisal_id.0))
            }
            NotificationEvent::ReviewCompleted => {
                ("review_completed.txt", format!("Appraisal {} completed", appraisal_id.0))
            }
            NotificationEvent::ReviewRejected => {
                ("review_rejected.txt", format!("Appraisal {} returned for revision", appraisal_id.0))
            }
        };

        let body = self.tera.render(template, &context)?;
        Ok(RenderedNotification { subject, body })
    }
}
