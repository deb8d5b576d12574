use chrono::{DateTime, Utc};
use sqlx::Row;

use appraisy_core::audit::{AuditError, AuditEvent, AuditOutcome, AuditSink};

use super::RepositoryError;
use crate::DbPool;

/// Audit sink backed by the `audit_event` table. Append-only; rows are
/// never updated or deleted by the workflow.
pub struct SqlAuditSink {
    pool: DbPool,
}

impl SqlAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn events_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT event_id, actor_id, action, entity_type, entity_id, outcome,
                    before_state, after_state, note, occurred_at
             FROM audit_event
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY occurred_at ASC, event_id ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }
}

fn outcome_as_str(outcome: &AuditOutcome) -> &'static str {
    match outcome {
        AuditOutcome::Success => "success",
        AuditOutcome::Rejected => "rejected",
    }
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, RepositoryError> {
    match s {
        "success" => Ok(AuditOutcome::Success),
        "rejected" => Ok(AuditOutcome::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown audit outcome `{other}`"))),
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let occurred_at_str: String =
        row.try_get("occurred_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad occurred_at: {e}")))?;
    let outcome_str: String =
        row.try_get("outcome").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(AuditEvent {
        event_id: row.try_get("event_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        actor_id: row.try_get("actor_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        action: row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        entity_type: row
            .try_get("entity_type")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        entity_id: row.try_get("entity_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        outcome: parse_outcome(&outcome_str)?,
        before: row.try_get("before_state").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        after: row.try_get("after_state").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        note: row.try_get("note").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        occurred_at,
    })
}

#[async_trait::async_trait]
impl AuditSink for SqlAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        sqlx::query(
            "INSERT INTO audit_event (event_id, actor_id, action, entity_type, entity_id,
                                      outcome, before_state, after_state, note, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(&event.actor_id)
        .bind(&event.action)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(outcome_as_str(&event.outcome))
        .bind(&event.before)
        .bind(&event.after)
        .bind(&event.note)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use appraisy_core::audit::{AuditEvent, AuditOutcome, AuditSink};

    use super::SqlAuditSink;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn records_and_reads_back_events_for_an_entity() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let sink = SqlAuditSink::new(pool);
        sink.record(
            AuditEvent::new(
                "emp-s1",
                "appraisal.decision_recorded",
                "appraisal",
                "APR-1",
                AuditOutcome::Success,
            )
            .with_before("submitted")
            .with_after("in_review"),
        )
        .await
        .expect("record");
        sink.record(AuditEvent::new(
            "emp-s2",
            "appraisal.decision_refused",
            "appraisal",
            "APR-1",
            AuditOutcome::Rejected,
        ))
        .await
        .expect("record");

        let events = sink.events_for_entity("appraisal", "APR-1").await.expect("read back");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "appraisal.decision_recorded");
        assert_eq!(events[0].before.as_deref(), Some("submitted"));
        assert_eq!(events[1].outcome, AuditOutcome::Rejected);

        let none = sink.events_for_entity("appraisal", "APR-2").await.expect("other entity");
        assert!(none.is_empty());
    }
}
