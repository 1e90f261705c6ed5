//! Domain-to-line-item assignment: scoring, greedy planning, operator
//! overrides, and the batch commit back to the order service.

mod config;
pub mod domain;
pub mod gateway;
pub mod planner;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use config::AssignmentConfig;
pub use domain::{
    AssignmentSuggestion, CandidateDomain, ClientId, ConfidenceTier, DomainId, KeywordEvidence,
    LineItem, LineItemId, LineItemStatus, MatchQuality, OrderId, QualificationStatus, TargetMatch,
};
pub use gateway::{CommitError, CommitGateway, CommitOutcome, CommitResult, CommitStatus};
pub use planner::AssignmentPlanner;
pub use repository::{
    AssignmentRequest, DomainAnalysisSource, GatewayError, LineItemCommitStatus, LineItemSource,
    OrderGateway, SourceError,
};
pub use router::assignment_router;
pub use scoring::{MatchBasis, MatchScore};
pub use service::{AssignmentService, AssignmentServiceError, ReassignView, SessionView};
pub use session::{AssignmentError, AssignmentSession, AssignmentStats, Reassignment};
