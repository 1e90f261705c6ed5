use linkdesk::error::AppError;
use linkdesk::workflows::assignment::{
    AssignmentRequest, CandidateDomain, DomainAnalysisSource, DomainId, GatewayError, LineItem,
    LineItemCommitStatus, LineItemSource, OrderGateway, OrderId, SourceError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Seed data for the in-memory collaborators and the offline planner.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Fixture {
    #[serde(default)]
    pub(crate) line_items: Vec<LineItem>,
    #[serde(default)]
    pub(crate) domains: Vec<CandidateDomain>,
}

impl Fixture {
    /// Line items grouped per order, orders sorted by id.
    pub(crate) fn orders(&self) -> BTreeMap<OrderId, Vec<LineItem>> {
        let mut orders: BTreeMap<OrderId, Vec<LineItem>> = BTreeMap::new();
        for item in &self.line_items {
            orders
                .entry(item.order_id.clone())
                .or_default()
                .push(item.clone());
        }
        orders
    }
}

pub(crate) fn load_fixture(path: &Path) -> Result<Fixture, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Stands in for the order management service: serves line items and
/// records committed assignments on them.
#[derive(Default)]
pub(crate) struct InMemoryOrderStore {
    orders: Mutex<BTreeMap<OrderId, Vec<LineItem>>>,
}

impl InMemoryOrderStore {
    pub(crate) fn from_line_items(line_items: Vec<LineItem>) -> Self {
        let mut orders: BTreeMap<OrderId, Vec<LineItem>> = BTreeMap::new();
        for item in line_items {
            orders.entry(item.order_id.clone()).or_default().push(item);
        }
        Self {
            orders: Mutex::new(orders),
        }
    }

    fn orders(&self) -> MutexGuard<'_, BTreeMap<OrderId, Vec<LineItem>>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LineItemSource for InMemoryOrderStore {
    fn line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<LineItem>, SourceError> {
        self.orders()
            .get(order_id)
            .cloned()
            .ok_or_else(|| SourceError::OrderNotFound(order_id.clone()))
    }
}

impl OrderGateway for InMemoryOrderStore {
    fn assign_domains(
        &self,
        order_id: &OrderId,
        requests: &[AssignmentRequest],
    ) -> Result<Vec<LineItemCommitStatus>, GatewayError> {
        let mut orders = self.orders();
        let items = orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown order {order_id}")))?;

        Ok(requests
            .iter()
            .map(|request| {
                let error = match items.iter_mut().find(|item| item.id == request.line_item_id) {
                    None => Some("unknown line item".to_string()),
                    Some(item) if item.assigned_domain_id.is_some() => {
                        Some("line item already has a domain".to_string())
                    }
                    Some(item) => {
                        item.assigned_domain_id = Some(request.domain_id.clone());
                        None
                    }
                };
                LineItemCommitStatus {
                    line_item_id: request.line_item_id.clone(),
                    persisted: error.is_none(),
                    error,
                }
            })
            .collect())
    }
}

/// Stands in for the bulk analysis results.
pub(crate) struct InMemoryDomainCatalog {
    domains: Vec<CandidateDomain>,
}

impl InMemoryDomainCatalog {
    pub(crate) fn new(domains: Vec<CandidateDomain>) -> Self {
        Self { domains }
    }
}

impl DomainAnalysisSource for InMemoryDomainCatalog {
    fn candidate_domains(&self, ids: &[DomainId]) -> Result<Vec<CandidateDomain>, SourceError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.domains.iter().find(|domain| &domain.id == id))
            .cloned()
            .collect())
    }
}
