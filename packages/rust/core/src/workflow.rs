//! Workflow state and the payloads that carry it between phases.
//!
//! The orchestrator keeps no session: Phase 1 hands a [`DiscoveryHandoff`]
//! back to the caller, who echoes the profile and (re-approved) competitor
//! list in a [`ContinueRequest`] to run Phase 2.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use compete_shared::{
    BusinessProfile, CompeteError, Competitor, CompetitorAnalysis, MarketAnalysis, Result,
    StrategicRecommendations, TargetContent, validate_competitor_count, validate_public_url,
};

/// Lifecycle of one workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Identifying,
    Validating,
    Analyzing,
    Complete,
    Error,
}

impl WorkflowState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, next) {
            (Idle, Identifying) | (Identifying, Validating) => true,
            (Idle | Validating, Analyzing) | (Analyzing, Complete) => true,
            (Idle | Complete | Error, Error) => false,
            (_, Error) => true,
            _ => false,
        }
    }
}

/// One pipeline invocation: a run id plus the current state.
#[derive(Debug)]
pub struct Run {
    pub id: Uuid,
    state: WorkflowState,
}

impl Run {
    /// A fresh run in `Idle`, with a time-ordered id.
    pub fn new() -> Self {
        Self::resume(WorkflowState::Idle)
    }

    /// A fresh run id picking up from `state` (Phase 2 starts in `Validating`).
    pub fn resume(state: WorkflowState) -> Self {
        Self {
            id: Uuid::now_v7(),
            state,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn advance(&mut self, next: WorkflowState) {
        if !self.state.can_advance_to(next) {
            warn!(run_id = %self.id, from = ?self.state, to = ?next, "unexpected workflow transition");
        }
        info!(run_id = %self.id, from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
    }

    /// Move to `Error` unless the run never started or already ended.
    pub fn fail(&mut self, err: &CompeteError) {
        if self.state.can_advance_to(WorkflowState::Error) {
            warn!(run_id = %self.id, from = ?self.state, error = %err, "workflow failed");
            self.state = WorkflowState::Error;
        }
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Phase payloads
// ---------------------------------------------------------------------------

/// Phase 1 request: `{url, competitors}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub competitors: Option<i64>,
}

impl StartRequest {
    /// Validated target URL and competitor count (`default_count` when absent).
    pub fn validate(&self, default_count: usize) -> Result<(Url, usize)> {
        let url = validate_public_url(&self.url)?;
        let count = match self.competitors {
            Some(n) => validate_competitor_count(n)?,
            None => default_count,
        };
        Ok((url, count))
    }
}

/// What Phase 1 hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryHandoff {
    pub target_profile: BusinessProfile,
    pub target_content: TargetContent,
    pub competitors: Vec<Competitor>,
}

/// Phase 2 request: the caller echoes the handoff back with its approvals.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequest {
    pub target_url: String,
    pub target_profile: BusinessProfile,
    pub competitors: Vec<Competitor>,
}

impl ContinueRequest {
    /// Check the target and every approved competitor URL, and that at least
    /// one competitor is approved.
    pub fn validate(&self) -> Result<Url> {
        let target = validate_public_url(&self.target_url)?;

        if self.target_profile.company_name.trim().is_empty() {
            return Err(CompeteError::validation("Target profile needs a company name"));
        }

        let approved: Vec<&Competitor> = self.competitors.iter().filter(|c| c.approved).collect();
        if approved.is_empty() {
            return Err(CompeteError::validation("At least one approved competitor is required"));
        }
        for competitor in approved {
            validate_public_url(&competitor.url).map_err(|e| {
                CompeteError::validation(format!("{}: {}", competitor.name, e.user_message()))
            })?;
        }

        Ok(target)
    }
}

/// Replace request: find fresh competitors avoiding `exclude_names`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRequest {
    pub target_profile: BusinessProfile,
    #[serde(default)]
    pub exclude_names: Vec<String>,
    pub count: i64,
    #[serde(default)]
    pub target_url: Option<String>,
}

impl ReplaceRequest {
    /// Validated count and optional target URL.
    pub fn validate(&self) -> Result<(usize, Option<Url>)> {
        let count = validate_competitor_count(self.count)?;
        let target = self
            .target_url
            .as_deref()
            .map(validate_public_url)
            .transpose()?;
        Ok((count, target))
    }
}

/// Everything Phase 2 produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub report: String,
    pub company_name: String,
    pub analyses: Vec<CompetitorAnalysis>,
    pub market: MarketAnalysis,
    pub recommendations: StrategicRecommendations,
}
