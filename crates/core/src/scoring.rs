use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::appraisal::AppraisalId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_score: Decimal,
    pub grade: String,
}

/// Maps a total score to a letter grade. Bands are (inclusive lower bound,
/// grade), checked highest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeScale {
    bands: Vec<(Decimal, String)>,
    fallback: String,
}

impl Default for GradeScale {
    fn default() -> Self {
        Self {
            bands: vec![
                (Decimal::new(90, 0), "A".to_string()),
                (Decimal::new(80, 0), "B".to_string()),
                (Decimal::new(70, 0), "C".to_string()),
                (Decimal::new(60, 0), "D".to_string()),
            ],
            fallback: "E".to_string(),
        }
    }
}

impl GradeScale {
    pub fn new(mut bands: Vec<(Decimal, String)>, fallback: impl Into<String>) -> Self {
        bands.sort_by(|left, right| right.0.cmp(&left.0));
        Self { bands, fallback: fallback.into() }
    }

    pub fn grade_for(&self, total_score: Decimal) -> &str {
        self.bands
            .iter()
            .find(|(threshold, _)| total_score >= *threshold)
            .map(|(_, grade)| grade.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}

#[derive(Debug, Error)]
#[error("final scoring failed for appraisal `{appraisal_id}`: {reason}")]
pub struct ScoringError {
    pub appraisal_id: String,
    pub reason: String,
}

/// Computes the final score and grade once the last approver signs off.
/// The aggregation over question responses lives with the forms layer;
/// the workflow only asks for the finished summary.
#[async_trait::async_trait]
pub trait FinalScoring: Send + Sync {
    async fn compute(&self, appraisal_id: &AppraisalId) -> Result<ScoreSummary, ScoringError>;
}

/// Deterministic scoring stub for tests and seeds.
#[derive(Clone, Debug)]
pub struct FixedScoring {
    summary: ScoreSummary,
}

impl FixedScoring {
    pub fn new(total_score: Decimal, scale: &GradeScale) -> Self {
        let grade = scale.grade_for(total_score).to_string();
        Self { summary: ScoreSummary { total_score, grade } }
    }
}

impl Default for FixedScoring {
    fn default() -> Self {
        Self::new(Decimal::new(85, 0), &GradeScale::default())
    }
}

#[async_trait::async_trait]
impl FinalScoring for FixedScoring {
    async fn compute(&self, _appraisal_id: &AppraisalId) -> Result<ScoreSummary, ScoringError> {
        Ok(self.summary.clone())
    }
}
