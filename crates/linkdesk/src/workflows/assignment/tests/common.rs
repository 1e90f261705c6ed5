use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::assignment::domain::{
    CandidateDomain, ClientId, DomainId, KeywordEvidence, LineItem, LineItemId, LineItemStatus,
    MatchQuality, OrderId, QualificationStatus, TargetMatch,
};
use crate::workflows::assignment::repository::{
    AssignmentRequest, DomainAnalysisSource, GatewayError, LineItemCommitStatus, LineItemSource,
    OrderGateway, SourceError,
};
use crate::workflows::assignment::{AssignmentConfig, AssignmentPlanner, AssignmentService};

pub(super) const ORDER: &str = "order-100";

pub(super) fn order_id() -> OrderId {
    OrderId(ORDER.to_string())
}

pub(super) fn domain(id: &str, suggested: Option<&str>) -> CandidateDomain {
    CandidateDomain {
        id: DomainId(id.to_string()),
        domain: format!("{id}.example.com"),
        qualification_status: QualificationStatus::HighQuality,
        suggested_target_url: suggested.map(str::to_string),
        target_match_data: Vec::new(),
    }
}

pub(super) fn with_evidence(
    mut domain: CandidateDomain,
    target: &str,
    quality: MatchQuality,
) -> CandidateDomain {
    domain.target_match_data.push(TargetMatch {
        target_url: target.to_string(),
        match_quality: quality,
        evidence: KeywordEvidence {
            direct_count: 12,
            related_count: 4,
            direct_median_position: Some(8.5),
            related_median_position: None,
        },
        reasoning: String::new(),
    });
    domain
}

pub(super) fn line_item(id: &str, target: Option<&str>) -> LineItem {
    LineItem {
        id: LineItemId(id.to_string()),
        order_id: order_id(),
        client_id: ClientId("client-7".to_string()),
        target_page_url: target.map(str::to_string),
        assigned_domain_id: None,
        status: LineItemStatus::Pending,
    }
}

pub(super) fn li(id: &str) -> LineItemId {
    LineItemId(id.to_string())
}

pub(super) fn did(id: &str) -> DomainId {
    DomainId(id.to_string())
}

pub(super) fn planner() -> AssignmentPlanner {
    AssignmentPlanner::new(AssignmentConfig::default())
}

pub(super) fn planner_with_threshold(best_available_threshold: u8) -> AssignmentPlanner {
    AssignmentPlanner::new(AssignmentConfig {
        best_available_threshold,
    })
}

/// Line items `A`, `B`, `C` targeting `/page1`..`/page3`.
pub(super) fn scenario_line_items() -> Vec<LineItem> {
    vec![
        line_item("A", Some("/page1")),
        line_item("B", Some("/page2")),
        line_item("C", Some("/page3")),
    ]
}

/// `D1` suggests `/page1`, `D2` has good evidence for `/page2`, `D3` has nothing.
pub(super) fn scenario_domains() -> Vec<CandidateDomain> {
    vec![
        domain("D1", Some("/page1")),
        with_evidence(domain("D2", None), "/page2", MatchQuality::Good),
        domain("D3", None),
    ]
}

#[derive(Default)]
pub(super) struct MemoryLineItems {
    orders: Mutex<HashMap<OrderId, Vec<LineItem>>>,
}

impl MemoryLineItems {
    pub(super) fn with_order(items: Vec<LineItem>) -> Self {
        let source = Self::default();
        source.replace(items);
        source
    }

    pub(super) fn replace(&self, items: Vec<LineItem>) {
        self.insert(order_id(), items);
    }

    pub(super) fn insert(&self, order: OrderId, items: Vec<LineItem>) {
        self.orders
            .lock()
            .expect("line item mutex poisoned")
            .insert(order, items);
    }
}

impl LineItemSource for MemoryLineItems {
    fn line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<LineItem>, SourceError> {
        self.orders
            .lock()
            .expect("line item mutex poisoned")
            .get(order_id)
            .cloned()
            .ok_or_else(|| SourceError::OrderNotFound(order_id.clone()))
    }
}

pub(super) struct MemoryDomains {
    domains: Vec<CandidateDomain>,
}

impl MemoryDomains {
    pub(super) fn new(domains: Vec<CandidateDomain>) -> Self {
        Self { domains }
    }
}

impl DomainAnalysisSource for MemoryDomains {
    fn candidate_domains(&self, ids: &[DomainId]) -> Result<Vec<CandidateDomain>, SourceError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.domains.iter().find(|domain| &domain.id == id))
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableDomains;

impl DomainAnalysisSource for UnavailableDomains {
    fn candidate_domains(&self, _ids: &[DomainId]) -> Result<Vec<CandidateDomain>, SourceError> {
        Err(SourceError::Unavailable("analysis store offline".to_string()))
    }
}

#[derive(Debug, Clone)]
pub(super) enum GatewayMode {
    AcceptAll,
    Reject(HashSet<LineItemId>),
    Omit(HashSet<LineItemId>),
    Offline,
    /// Accepts everything after sleeping, like a slow order service.
    Stall(Duration),
}

/// Order API fake that records every batch it receives.
pub(super) struct RecordingOrders {
    mode: Mutex<GatewayMode>,
    batches: Mutex<Vec<(OrderId, Vec<AssignmentRequest>)>>,
}

impl RecordingOrders {
    pub(super) fn new(mode: GatewayMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn set_mode(&self, mode: GatewayMode) {
        *self.mode.lock().expect("gateway mutex poisoned") = mode;
    }

    pub(super) fn batches(&self) -> Vec<(OrderId, Vec<AssignmentRequest>)> {
        self.batches.lock().expect("gateway mutex poisoned").clone()
    }

    /// Blocks until `count` batches have reached the gateway.
    pub(super) fn wait_for_batches(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.batches().len() < count {
            assert!(Instant::now() < deadline, "gateway never received a batch");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl OrderGateway for RecordingOrders {
    fn assign_domains(
        &self,
        order_id: &OrderId,
        requests: &[AssignmentRequest],
    ) -> Result<Vec<LineItemCommitStatus>, GatewayError> {
        self.batches
            .lock()
            .expect("gateway mutex poisoned")
            .push((order_id.clone(), requests.to_vec()));

        let mode = self.mode.lock().expect("gateway mutex poisoned").clone();
        let statuses = match mode {
            GatewayMode::Offline => {
                return Err(GatewayError::Transport("connection refused".to_string()))
            }
            GatewayMode::AcceptAll => accept_all(requests),
            GatewayMode::Stall(delay) => {
                thread::sleep(delay);
                accept_all(requests)
            }
            GatewayMode::Reject(rejected) => requests
                .iter()
                .map(|request| {
                    let refused = rejected.contains(&request.line_item_id);
                    LineItemCommitStatus {
                        line_item_id: request.line_item_id.clone(),
                        persisted: !refused,
                        error: refused.then(|| "line item locked".to_string()),
                    }
                })
                .collect(),
            GatewayMode::Omit(omitted) => requests
                .iter()
                .filter(|request| !omitted.contains(&request.line_item_id))
                .map(|request| LineItemCommitStatus {
                    line_item_id: request.line_item_id.clone(),
                    persisted: true,
                    error: None,
                })
                .collect(),
        };
        Ok(statuses)
    }
}

fn accept_all(requests: &[AssignmentRequest]) -> Vec<LineItemCommitStatus> {
    requests
        .iter()
        .map(|request| LineItemCommitStatus {
            line_item_id: request.line_item_id.clone(),
            persisted: true,
            error: None,
        })
        .collect()
}

pub(super) type TestService = AssignmentService<MemoryLineItems, MemoryDomains, RecordingOrders>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryLineItems>,
    Arc<RecordingOrders>,
) {
    let line_items = Arc::new(MemoryLineItems::with_order(scenario_line_items()));
    let domains = Arc::new(MemoryDomains::new(scenario_domains()));
    let orders = Arc::new(RecordingOrders::new(GatewayMode::AcceptAll));
    let service = AssignmentService::new(
        line_items.clone(),
        domains,
        orders.clone(),
        AssignmentConfig::default(),
    );
    (service, line_items, orders)
}

pub(super) fn scenario_domain_ids() -> Vec<DomainId> {
    vec![did("D1"), did("D2"), did("D3")]
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
