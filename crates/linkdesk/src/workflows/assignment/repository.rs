use serde::{Deserialize, Serialize};

use super::domain::{CandidateDomain, DomainId, LineItem, LineItemId, OrderId};

/// Order management read side: the line items of one order.
pub trait LineItemSource: Send + Sync {
    fn line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<LineItem>, SourceError>;
}

/// Bulk domain analysis output. Unknown ids are skipped, not errors.
pub trait DomainAnalysisSource: Send + Sync {
    fn candidate_domains(&self, ids: &[DomainId]) -> Result<Vec<CandidateDomain>, SourceError>;
}

/// Order API batch endpoint that persists confirmed assignments.
pub trait OrderGateway: Send + Sync {
    fn assign_domains(
        &self,
        order_id: &OrderId,
        requests: &[AssignmentRequest],
    ) -> Result<Vec<LineItemCommitStatus>, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("order service rejected the batch: {0}")]
    Rejected(String),
    #[error("order service unreachable: {0}")]
    Transport(String),
}

/// Wire payload for one confirmed assignment. Anchor text is filled in later
/// by the content workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub line_item_id: LineItemId,
    pub domain_id: DomainId,
    pub target_page_url: Option<String>,
    pub anchor_text: Option<String>,
}

/// Per-line-item answer from the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemCommitStatus {
    pub line_item_id: LineItemId,
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
