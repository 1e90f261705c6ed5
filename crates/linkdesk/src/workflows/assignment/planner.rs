use super::config::AssignmentConfig;
use super::domain::{AssignmentSuggestion, CandidateDomain, LineItem};
use super::scoring::{self, MatchBasis};

/// Greedy three-phase planner pairing line items with candidate domains.
///
/// Phases run in a fixed order: perfect matches against the AI-suggested
/// target, best-available evidence matches above the configured threshold,
/// then positional fallback. A domain claimed in an earlier phase, or earlier
/// in the same phase, is never reconsidered.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPlanner {
    config: AssignmentConfig,
}

impl AssignmentPlanner {
    pub fn new(config: AssignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// Whether a best-available score clears the threshold. Inclusive.
    pub fn accepts_best_available(&self, score: u8) -> bool {
        score >= self.config.best_available_threshold
    }

    pub fn plan(
        &self,
        domains: &[CandidateDomain],
        line_items: &[LineItem],
    ) -> Vec<AssignmentSuggestion> {
        // Indices into `domains`, kept in input order as domains are claimed.
        let mut pool: Vec<usize> = (0..domains.len()).collect();
        let mut resolved = vec![false; line_items.len()];
        let mut suggestions = Vec::with_capacity(line_items.len().min(domains.len()));

        for (item_index, line_item) in line_items.iter().enumerate() {
            let Some(target) = line_item.target_page_url.as_deref() else {
                continue;
            };
            let Some(slot) = pool
                .iter()
                .position(|&domain_index| domains[domain_index].suggests(target))
            else {
                continue;
            };

            let domain = &domains[pool.remove(slot)];
            suggestions.push(scoring::score(domain, line_item).into_suggestion(line_item, domain));
            resolved[item_index] = true;
        }

        for (item_index, line_item) in line_items.iter().enumerate() {
            if resolved[item_index] || line_item.target_page_url.is_none() {
                continue;
            }

            let mut best: Option<(usize, scoring::MatchScore)> = None;
            for (slot, &domain_index) in pool.iter().enumerate() {
                let candidate = scoring::score(&domains[domain_index], line_item);
                if candidate.basis == MatchBasis::NoEvidence {
                    continue;
                }
                let improves = best
                    .as_ref()
                    .map_or(true, |(_, current)| candidate.score > current.score);
                if improves {
                    best = Some((slot, candidate));
                }
            }

            let Some((slot, matched)) = best else {
                continue;
            };
            if !self.accepts_best_available(matched.score) {
                continue;
            }

            let domain = &domains[pool.remove(slot)];
            suggestions.push(matched.into_suggestion(line_item, domain));
            resolved[item_index] = true;
        }

        let leftovers = line_items
            .iter()
            .enumerate()
            .filter(|(item_index, _)| !resolved[*item_index])
            .map(|(_, line_item)| line_item);

        for (line_item, &domain_index) in leftovers.zip(pool.iter()) {
            let domain = &domains[domain_index];
            let placed = scoring::positional(domain, line_item);
            suggestions.push(placed.into_suggestion(line_item, domain));
        }

        suggestions
    }
}
