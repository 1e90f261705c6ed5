use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use super::config::AssignmentConfig;
use super::domain::{AssignmentSuggestion, DomainId, LineItemId, OrderId};
use super::gateway::{CommitError, CommitGateway, CommitResult};
use super::planner::AssignmentPlanner;
use super::repository::{DomainAnalysisSource, LineItemSource, OrderGateway, SourceError};
use super::session::{AssignmentError, AssignmentSession, AssignmentStats, Reassignment};

/// Serializable snapshot of a session handed to the operator UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub order_id: OrderId,
    pub suggestions: Vec<AssignmentSuggestion>,
    pub stats: AssignmentStats,
    pub unassigned_line_items: Vec<LineItemId>,
}

impl SessionView {
    pub fn of(session: &AssignmentSession) -> Self {
        Self {
            order_id: session.order_id().clone(),
            suggestions: session.suggestions().to_vec(),
            stats: session.stats(),
            unassigned_line_items: session
                .unassigned_line_items()
                .into_iter()
                .map(|item| item.id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReassignView {
    #[serde(flatten)]
    pub reassignment: Reassignment,
    pub session: SessionView,
}

type SessionHandle = Arc<Mutex<AssignmentSession>>;

/// Holds one assignment session per order and wires it to the collaborators.
///
/// The registry lock only guards lookups. Each session has its own lock, so a
/// slow collaborator call for one order never blocks another order.
pub struct AssignmentService<L, D, G> {
    line_items: Arc<L>,
    domains: Arc<D>,
    commits: CommitGateway<G>,
    planner: AssignmentPlanner,
    sessions: Mutex<HashMap<OrderId, SessionHandle>>,
}

impl<L, D, G> AssignmentService<L, D, G>
where
    L: LineItemSource + 'static,
    D: DomainAnalysisSource + 'static,
    G: OrderGateway + 'static,
{
    pub fn new(
        line_items: Arc<L>,
        domains: Arc<D>,
        orders: Arc<G>,
        config: AssignmentConfig,
    ) -> Self {
        Self {
            line_items,
            domains,
            commits: CommitGateway::new(orders),
            planner: AssignmentPlanner::new(config),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens (or replaces) the session for an order and computes a first plan.
    pub fn open(
        &self,
        order_id: &OrderId,
        domain_ids: &[DomainId],
    ) -> Result<SessionView, AssignmentServiceError> {
        let line_items = self.line_items.line_items_for_order(order_id)?;
        let domains = self.domains.candidate_domains(domain_ids)?;

        let mut session =
            AssignmentSession::new(order_id.clone(), domains, line_items, self.planner.clone())?;
        session.regenerate();
        log_plan(&session);

        let view = SessionView::of(&session);
        self.registry()
            .insert(order_id.clone(), Arc::new(Mutex::new(session)));
        Ok(view)
    }

    pub fn view(&self, order_id: &OrderId) -> Result<SessionView, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let session = lock(&handle);
        Ok(SessionView::of(&session))
    }

    pub fn stats(&self, order_id: &OrderId) -> Result<AssignmentStats, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let stats = lock(&handle).stats();
        Ok(stats)
    }

    /// Re-reads both collaborators for the session's order and domains, then replans.
    pub fn regenerate(&self, order_id: &OrderId) -> Result<SessionView, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let mut session = lock(&handle);

        let line_items = self.line_items.line_items_for_order(order_id)?;
        let domains = self.domains.candidate_domains(&session.domain_ids())?;
        session.replace_snapshot(domains, line_items)?;
        session.regenerate();
        log_plan(&session);

        Ok(SessionView::of(&session))
    }

    pub fn reassign(
        &self,
        order_id: &OrderId,
        line_item_id: &LineItemId,
        domain_id: &DomainId,
    ) -> Result<ReassignView, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let mut session = lock(&handle);
        let reassignment = session.reassign(line_item_id, domain_id)?;
        debug!(
            %order_id,
            %line_item_id,
            %domain_id,
            confidence = reassignment.suggestion.confidence.label(),
            "line item reassigned"
        );

        Ok(ReassignView {
            reassignment,
            session: SessionView::of(&session),
        })
    }

    pub fn unassign(
        &self,
        order_id: &OrderId,
        line_item_id: &LineItemId,
    ) -> Result<SessionView, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let mut session = lock(&handle);
        session.unassign(line_item_id)?;
        Ok(SessionView::of(&session))
    }

    /// Sends the current suggestion set to the order service.
    ///
    /// Persisted suggestions leave the session; a session with nothing left
    /// is closed. On failure the session is untouched so the operator can retry.
    pub fn commit(&self, order_id: &OrderId) -> Result<CommitResult, AssignmentServiceError> {
        let handle = self.lookup(order_id)?;
        let mut session = lock(&handle);

        if session.suggestions().is_empty() {
            return Err(AssignmentServiceError::NothingToCommit(order_id.clone()));
        }

        let result = self.commits.commit(&session)?;

        let persisted: HashSet<LineItemId> = result
            .persisted()
            .map(|outcome| outcome.line_item_id.clone())
            .collect();
        session.retain_uncommitted(&persisted);
        let settled = session.is_settled();
        drop(session);

        if settled {
            let mut registry = self.registry();
            // `open` may have replaced the session while the batch was in flight.
            if registry
                .get(order_id)
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                registry.remove(order_id);
                info!(%order_id, "assignment session closed after commit");
            }
        }

        Ok(result)
    }

    pub fn close(&self, order_id: &OrderId) -> bool {
        self.registry().remove(order_id).is_some()
    }

    fn lookup(&self, order_id: &OrderId) -> Result<SessionHandle, AssignmentServiceError> {
        self.registry()
            .get(order_id)
            .cloned()
            .ok_or_else(|| AssignmentServiceError::SessionNotFound(order_id.clone()))
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<OrderId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock(handle: &SessionHandle) -> MutexGuard<'_, AssignmentSession> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_plan(session: &AssignmentSession) {
    let stats = session.stats();
    info!(
        order_id = %session.order_id(),
        perfect = stats.perfect,
        good = stats.good,
        fair = stats.fair,
        fallback = stats.fallback,
        unassigned = stats.unassigned,
        "assignment plan generated"
    );
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentServiceError {
    #[error("no assignment session open for order {0}")]
    SessionNotFound(OrderId),
    #[error("order {0} has no suggestions to commit")]
    NothingToCommit(OrderId),
    #[error(transparent)]
    Session(#[from] AssignmentError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}
