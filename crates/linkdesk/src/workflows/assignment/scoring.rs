//! Confidence scoring for a single (candidate domain, line item) pair.
//!
//! The score is derived in a fixed order: an exact match against the
//! domain's AI-suggested target page, then the keyword evidence recorded for
//! the line item's target, and finally a fallback when neither applies.

use serde::{Deserialize, Serialize};

use super::domain::{
    AssignmentSuggestion, CandidateDomain, ConfidenceTier, LineItem, MatchQuality,
};

/// Score awarded when the domain's suggested target equals the line item's target.
pub const PERFECT_SCORE: u8 = 100;

/// Score carried by positional and no-evidence pairings.
pub const FALLBACK_SCORE: u8 = 30;

/// Lowest evidence score classified as `good`.
pub const GOOD_TIER_FLOOR: u8 = 80;

/// Lowest evidence score classified as `fair`.
pub const FAIR_TIER_FLOOR: u8 = 50;

/// Which rule produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    SuggestedTarget,
    Evidence,
    NoEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub confidence: ConfidenceTier,
    pub score: u8,
    pub match_quality: Option<MatchQuality>,
    pub reasoning: String,
    pub evidence_preview: String,
    pub basis: MatchBasis,
}

impl MatchScore {
    pub fn into_suggestion(
        self,
        line_item: &LineItem,
        domain: &CandidateDomain,
    ) -> AssignmentSuggestion {
        AssignmentSuggestion {
            line_item_id: line_item.id.clone(),
            domain_id: domain.id.clone(),
            confidence: self.confidence,
            score: self.score,
            match_quality: self.match_quality,
            reasoning: self.reasoning,
            evidence_preview: self.evidence_preview,
        }
    }
}

/// Tier for a score taken from keyword evidence.
pub const fn tier_for_evidence_score(score: u8) -> ConfidenceTier {
    if score >= GOOD_TIER_FLOOR {
        ConfidenceTier::Good
    } else if score >= FAIR_TIER_FLOOR {
        ConfidenceTier::Fair
    } else {
        ConfidenceTier::Fallback
    }
}

/// Scores a pair. Total and deterministic.
pub fn score(domain: &CandidateDomain, line_item: &LineItem) -> MatchScore {
    let Some(target) = line_item.target_page_url.as_deref() else {
        return fallback(domain);
    };

    let evidence = domain.evidence_for(target);

    if domain.suggests(target) {
        return MatchScore {
            confidence: ConfidenceTier::Perfect,
            score: PERFECT_SCORE,
            match_quality: Some(MatchQuality::Excellent),
            reasoning: format!("AI suggested {target} as the best target for {}", domain.domain),
            evidence_preview: evidence
                .map(|record| record.evidence.preview())
                .unwrap_or_else(|| "AI-suggested target page".to_string()),
            basis: MatchBasis::SuggestedTarget,
        };
    }

    match evidence {
        Some(record) => {
            let score = record.match_quality.score();
            let reasoning = if record.reasoning.trim().is_empty() {
                format!(
                    "{} keyword match for {target}",
                    record.match_quality.label()
                )
            } else {
                record.reasoning.clone()
            };

            MatchScore {
                confidence: tier_for_evidence_score(score),
                score,
                match_quality: Some(record.match_quality),
                reasoning,
                evidence_preview: record.evidence.preview(),
                basis: MatchBasis::Evidence,
            }
        }
        None => fallback(domain),
    }
}

/// Pairing used when relevance is ignored.
pub fn fallback(domain: &CandidateDomain) -> MatchScore {
    MatchScore {
        confidence: ConfidenceTier::Fallback,
        score: FALLBACK_SCORE,
        match_quality: Some(MatchQuality::Fair),
        reasoning: format!(
            "best available domain ({})",
            domain.qualification_status.label()
        ),
        evidence_preview: "no keyword evidence".to_string(),
        basis: MatchBasis::NoEvidence,
    }
}

/// Fallback pairing that still surfaces whatever evidence the domain holds for
/// the line item's target. Quality and preview always come from the same record.
pub fn positional(domain: &CandidateDomain, line_item: &LineItem) -> MatchScore {
    let mut score = fallback(domain);
    if let Some(record) = line_item
        .target_page_url
        .as_deref()
        .and_then(|target| domain.evidence_for(target))
    {
        score.match_quality = Some(record.match_quality);
        score.evidence_preview = record.evidence.preview();
    }
    score
}
