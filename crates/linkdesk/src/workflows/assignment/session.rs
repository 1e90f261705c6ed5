use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    AssignmentSuggestion, CandidateDomain, ConfidenceTier, DomainId, LineItem, LineItemId, OrderId,
};
use super::planner::AssignmentPlanner;
use super::scoring;

/// Operator-facing counts per confidence tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub perfect: usize,
    pub good: usize,
    pub fair: usize,
    pub fallback: usize,
    pub unassigned: usize,
}

impl AssignmentStats {
    pub fn summary(&self) -> String {
        format!(
            "{} perfect, {} good, {} fair, {} fallback, {} unassigned",
            self.perfect, self.good, self.fair, self.fallback, self.unassigned
        )
    }
}

/// Result of a manual override.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reassignment {
    pub suggestion: AssignmentSuggestion,
    /// Line item that held the requested domain and lost it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displaced: Option<LineItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<AssignmentSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("line item {0} is not part of this assignment session")]
    UnknownLineItem(LineItemId),
    #[error("domain {0} is not part of this assignment session")]
    UnknownDomain(DomainId),
    #[error("domain {0} appears more than once in the candidate pool")]
    DuplicateDomain(DomainId),
    #[error("line item {0} appears more than once in the order snapshot")]
    DuplicateLineItem(LineItemId),
}

/// Suggestion set for one order plus the input snapshot it was computed from.
///
/// Every mutation keeps each domain and each line item in at most one
/// suggestion, and only ever references ids present in the snapshot.
#[derive(Debug, Clone)]
pub struct AssignmentSession {
    order_id: OrderId,
    planner: AssignmentPlanner,
    domains: Vec<CandidateDomain>,
    line_items: Vec<LineItem>,
    suggestions: Vec<AssignmentSuggestion>,
}

impl AssignmentSession {
    /// Snapshots the inputs. Closed or already assigned line items are dropped.
    pub fn new(
        order_id: OrderId,
        domains: Vec<CandidateDomain>,
        line_items: Vec<LineItem>,
        planner: AssignmentPlanner,
    ) -> Result<Self, AssignmentError> {
        let (domains, line_items) = snapshot(domains, line_items)?;
        Ok(Self {
            order_id,
            planner,
            domains,
            line_items,
            suggestions: Vec::new(),
        })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn domains(&self) -> &[CandidateDomain] {
        &self.domains
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn suggestions(&self) -> &[AssignmentSuggestion] {
        &self.suggestions
    }

    pub fn domain_ids(&self) -> Vec<DomainId> {
        self.domains.iter().map(|domain| domain.id.clone()).collect()
    }

    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| &item.id == id)
    }

    pub fn domain(&self, id: &DomainId) -> Option<&CandidateDomain> {
        self.domains.iter().find(|domain| &domain.id == id)
    }

    /// Swaps in fresh inputs and clears the suggestion set.
    pub fn replace_snapshot(
        &mut self,
        domains: Vec<CandidateDomain>,
        line_items: Vec<LineItem>,
    ) -> Result<(), AssignmentError> {
        let (domains, line_items) = snapshot(domains, line_items)?;
        self.domains = domains;
        self.line_items = line_items;
        self.suggestions.clear();
        Ok(())
    }

    pub fn regenerate(&mut self) -> &[AssignmentSuggestion] {
        self.suggestions = self.planner.plan(&self.domains, &self.line_items);
        &self.suggestions
    }

    /// Pairs `line_item_id` with `domain_id`, displacing whichever line item
    /// held the domain. The rest of the suggestion set is left as is.
    pub fn reassign(
        &mut self,
        line_item_id: &LineItemId,
        domain_id: &DomainId,
    ) -> Result<Reassignment, AssignmentError> {
        let line_item = self
            .line_item(line_item_id)
            .ok_or_else(|| AssignmentError::UnknownLineItem(line_item_id.clone()))?;
        let domain = self
            .domain(domain_id)
            .ok_or_else(|| AssignmentError::UnknownDomain(domain_id.clone()))?;
        let suggestion = scoring::score(domain, line_item).into_suggestion(line_item, domain);

        let previous_slot = self
            .suggestions
            .iter()
            .position(|existing| &existing.line_item_id == line_item_id);
        let replaced = previous_slot.map(|slot| self.suggestions.remove(slot));

        let displaced_slot = self
            .suggestions
            .iter()
            .position(|existing| &existing.domain_id == domain_id);
        let displaced = displaced_slot.map(|slot| self.suggestions.remove(slot).line_item_id);

        match previous_slot {
            Some(slot) => {
                let slot = match displaced_slot {
                    Some(removed) if removed < slot => slot - 1,
                    _ => slot,
                };
                self.suggestions.insert(slot, suggestion.clone());
            }
            None => self.suggestions.push(suggestion.clone()),
        }

        if let Some(line_item_id) = &displaced {
            warn!(
                order_id = %self.order_id,
                displaced = %line_item_id,
                domain_id = %domain_id,
                "reassignment displaced the previous holder of the domain"
            );
        }

        Ok(Reassignment {
            suggestion,
            displaced,
            replaced,
        })
    }

    pub fn unassign(
        &mut self,
        line_item_id: &LineItemId,
    ) -> Result<Option<AssignmentSuggestion>, AssignmentError> {
        if self.line_item(line_item_id).is_none() {
            return Err(AssignmentError::UnknownLineItem(line_item_id.clone()));
        }

        Ok(self
            .suggestions
            .iter()
            .position(|existing| &existing.line_item_id == line_item_id)
            .map(|slot| self.suggestions.remove(slot)))
    }

    /// Snapshot line items without a suggestion, in snapshot order.
    pub fn unassigned_line_items(&self) -> Vec<&LineItem> {
        let assigned: HashSet<&LineItemId> = self
            .suggestions
            .iter()
            .map(|suggestion| &suggestion.line_item_id)
            .collect();
        self.line_items
            .iter()
            .filter(|item| !assigned.contains(&item.id))
            .collect()
    }

    pub fn stats(&self) -> AssignmentStats {
        let mut stats = AssignmentStats::default();
        for suggestion in &self.suggestions {
            match suggestion.confidence {
                ConfidenceTier::Perfect => stats.perfect += 1,
                ConfidenceTier::Good => stats.good += 1,
                ConfidenceTier::Fair => stats.fair += 1,
                ConfidenceTier::Fallback => stats.fallback += 1,
            }
        }
        stats.unassigned = self.line_items.len().saturating_sub(self.suggestions.len());
        stats
    }

    /// Drops suggestions the order service has persisted.
    /// Drops persisted pairs from the session. Their line items and domains
    /// leave the snapshot, so later overrides cannot touch them.
    pub fn retain_uncommitted(&mut self, persisted: &HashSet<LineItemId>) {
        let claimed: HashSet<DomainId> = self
            .suggestions
            .iter()
            .filter(|suggestion| persisted.contains(&suggestion.line_item_id))
            .map(|suggestion| suggestion.domain_id.clone())
            .collect();

        self.suggestions
            .retain(|suggestion| !persisted.contains(&suggestion.line_item_id));
        self.line_items.retain(|item| !persisted.contains(&item.id));
        self.domains.retain(|domain| !claimed.contains(&domain.id));
    }

    /// True once no suggestion and no unassigned line item remains.
    pub fn is_settled(&self) -> bool {
        self.suggestions.is_empty() && self.line_items.is_empty()
    }
}

fn snapshot(
    domains: Vec<CandidateDomain>,
    line_items: Vec<LineItem>,
) -> Result<(Vec<CandidateDomain>, Vec<LineItem>), AssignmentError> {
    let mut seen_domains = HashSet::new();
    for domain in &domains {
        if !seen_domains.insert(&domain.id) {
            return Err(AssignmentError::DuplicateDomain(domain.id.clone()));
        }
    }

    let line_items: Vec<LineItem> = line_items
        .into_iter()
        .filter(LineItem::is_assignable)
        .collect();

    let mut seen_items = HashSet::new();
    for item in &line_items {
        if !seen_items.insert(&item.id) {
            return Err(AssignmentError::DuplicateLineItem(item.id.clone()));
        }
    }

    Ok((domains, line_items))
}
