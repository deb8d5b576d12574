pub mod audit;
pub mod chain;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod review;
pub mod scoring;

pub use audit::{AuditError, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use chain::{ChainBuildError, ChainBuilder, ChainPolicy};
pub use directory::{OrgDirectory, OrgSnapshot};
pub use domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus, FormId};
pub use domain::employee::{Employee, EmployeeId, EmployeeType};
pub use domain::level::{ApprovalLevel, Decision, LevelStatus};
pub use errors::{DomainError, WorkflowError};
pub use notify::{
    InMemorySender, NotificationEvent, NotificationSender, NotifyError, SentNotification,
};
pub use review::{
    can_decide, current_level, evaluate_decision, DecisionOutcome, RatingEntry, ReviewError,
};
pub use scoring::{FinalScoring, FixedScoring, GradeScale, ScoreSummary, ScoringError};
