use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{DomainId, LineItemId, OrderId};
use super::repository::{AssignmentRequest, GatewayError, LineItemCommitStatus, OrderGateway};
use super::session::AssignmentSession;

const MISSING_FROM_RESPONSE: &str = "missing from order service response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitStatus {
    Persisted,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub line_item_id: LineItemId,
    pub domain_id: DomainId,
    #[serde(flatten)]
    pub status: CommitStatus,
}

impl CommitOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self.status, CommitStatus::Persisted)
    }
}

/// Per-suggestion report of a batch commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
    pub order_id: OrderId,
    pub committed_at: DateTime<Utc>,
    pub outcomes: Vec<CommitOutcome>,
}

impl CommitResult {
    pub fn persisted(&self) -> impl Iterator<Item = &CommitOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_persisted())
    }

    pub fn rejected(&self) -> impl Iterator<Item = &CommitOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_persisted())
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(CommitOutcome::is_persisted)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Pass-through from a session's suggestions to the order service batch call.
pub struct CommitGateway<G> {
    orders: Arc<G>,
}

impl<G> CommitGateway<G>
where
    G: OrderGateway + 'static,
{
    pub fn new(orders: Arc<G>) -> Self {
        Self { orders }
    }

    pub fn requests(session: &AssignmentSession) -> Vec<AssignmentRequest> {
        session
            .suggestions()
            .iter()
            .map(|suggestion| AssignmentRequest {
                line_item_id: suggestion.line_item_id.clone(),
                domain_id: suggestion.domain_id.clone(),
                target_page_url: session
                    .line_item(&suggestion.line_item_id)
                    .and_then(|item| item.target_page_url.clone()),
                anchor_text: None,
            })
            .collect()
    }

    /// Issues a single batch call. The session is never modified here.
    pub fn commit(&self, session: &AssignmentSession) -> Result<CommitResult, CommitError> {
        let order_id = session.order_id();
        let requests = Self::requests(session);

        let statuses = match self.orders.assign_domains(order_id, &requests) {
            Ok(statuses) => statuses,
            Err(err) => {
                warn!(%order_id, batch = requests.len(), error = %err, "assignment commit failed");
                return Err(err.into());
            }
        };

        let result = CommitResult {
            order_id: order_id.clone(),
            committed_at: Utc::now(),
            outcomes: match_outcomes(requests, statuses),
        };

        info!(
            %order_id,
            persisted = result.persisted().count(),
            rejected = result.rejected().count(),
            "assignment batch committed"
        );

        Ok(result)
    }
}

fn match_outcomes(
    requests: Vec<AssignmentRequest>,
    statuses: Vec<LineItemCommitStatus>,
) -> Vec<CommitOutcome> {
    let mut by_line_item: HashMap<LineItemId, LineItemCommitStatus> = statuses
        .into_iter()
        .map(|status| (status.line_item_id.clone(), status))
        .collect();

    requests
        .into_iter()
        .map(|request| {
            let status = match by_line_item.remove(&request.line_item_id) {
                Some(status) if status.persisted => CommitStatus::Persisted,
                Some(status) => CommitStatus::Rejected {
                    reason: status
                        .error
                        .unwrap_or_else(|| "rejected by order service".to_string()),
                },
                None => CommitStatus::Rejected {
                    reason: MISSING_FROM_RESPONSE.to_string(),
                },
            };
            CommitOutcome {
                line_item_id: request.line_item_id,
                domain_id: request.domain_id,
                status,
            }
        })
        .collect()
}
