use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a candidate domain produced by bulk analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(pub String);

/// Identifier of a single requested link placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(DomainId, LineItemId, OrderId, ClientId);

/// Vetting outcome attached to a domain by the SEO analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    Qualified,
    HighQuality,
    GoodQuality,
    MarginalQuality,
    Unqualified,
}

impl QualificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Qualified => "qualified",
            Self::HighQuality => "high_quality",
            Self::GoodQuality => "good_quality",
            Self::MarginalQuality => "marginal_quality",
            Self::Unqualified => "unqualified",
        }
    }
}

/// Quality grade the analysis assigned to a domain for one target page.
///
/// Values the analysis step emits that are not recognised land on `Unknown`,
/// which scores zero rather than passing through silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(other)]
    Unknown,
}

impl MatchQuality {
    pub const fn score(self) -> u8 {
        match self {
            Self::Excellent => 90,
            Self::Good => 70,
            Self::Fair => 50,
            Self::Poor => 20,
            Self::Unknown => 0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unknown => "unknown",
        }
    }
}

/// Keyword-overlap statistics backing a match quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordEvidence {
    pub direct_count: u32,
    pub related_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_median_position: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_median_position: Option<f32>,
}

impl KeywordEvidence {
    pub fn preview(&self) -> String {
        format!(
            "{} direct + {} related keywords",
            self.direct_count, self.related_count
        )
    }
}

/// Per-target evidence record. A domain carries at most one per target URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMatch {
    pub target_url: String,
    pub match_quality: MatchQuality,
    pub evidence: KeywordEvidence,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDomain {
    pub id: DomainId,
    pub domain: String,
    pub qualification_status: QualificationStatus,
    #[serde(default)]
    pub suggested_target_url: Option<String>,
    #[serde(default)]
    pub target_match_data: Vec<TargetMatch>,
}

impl CandidateDomain {
    pub fn evidence_for(&self, target_url: &str) -> Option<&TargetMatch> {
        self.target_match_data
            .iter()
            .find(|record| record.target_url == target_url)
    }

    pub fn suggests(&self, target_url: &str) -> bool {
        self.suggested_target_url.as_deref() == Some(target_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Draft,
    Pending,
    InProgress,
    Delivered,
    Cancelled,
    Refunded,
}

impl LineItemStatus {
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// A requested backlink placement within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub client_id: ClientId,
    #[serde(default)]
    pub target_page_url: Option<String>,
    #[serde(default)]
    pub assigned_domain_id: Option<DomainId>,
    pub status: LineItemStatus,
}

impl LineItem {
    /// Whether the item can enter an assignment session at all.
    pub fn is_assignable(&self) -> bool {
        !self.status.is_closed() && self.assigned_domain_id.is_none()
    }
}

/// Ordered confidence tiers; `Perfect` ranks highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Fallback,
    Fair,
    Good,
    Perfect,
}

impl ConfidenceTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Fallback => "fallback",
        }
    }
}

/// Proposed pairing of one line item with one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSuggestion {
    pub line_item_id: LineItemId,
    pub domain_id: DomainId,
    pub confidence: ConfidenceTier,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_quality: Option<MatchQuality>,
    pub reasoning: String,
    pub evidence_preview: String,
}
