//! Progress events emitted while a pipeline phase runs.
//!
//! Every event has a name and a single-line JSON payload; on the wire a
//! frame is `event: <name>\ndata: <json>\n\n`.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use compete_shared::Competitor;

/// Pipeline step a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Scraping,
    Profile,
    Identifying,
    ScrapingCompetitors,
    Analyzing,
    Market,
    Recommendations,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Complete,
}

/// Competitor as announced to the client during discovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSummary {
    pub name: String,
    pub url: String,
    pub relevance_score: f64,
}

impl From<&Competitor> for CompetitorSummary {
    fn from(c: &Competitor) -> Self {
        Self {
            name: c.name.clone(),
            url: c.url.clone(),
            relevance_score: c.relevance_score,
        }
    }
}

/// The closed set of events a run can produce.
///
/// `Complete` and `Error` are terminal: a stream carries exactly one of them,
/// last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PipelineEvent {
    Progress {
        step: Step,
        status: Status,
        message: String,
    },
    Profile {
        company_name: String,
        industry: String,
    },
    Competitors(Vec<CompetitorSummary>),
    Complete {
        report: String,
        company_name: String,
    },
    Error {
        message: String,
    },
}

impl PipelineEvent {
    pub fn progress(step: Step, status: Status, message: impl Into<String>) -> Self {
        Self::Progress {
            step,
            status,
            message: message.into(),
        }
    }

    /// Event name used in the `event:` line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Profile { .. } => "profile",
            Self::Competitors(_) => "competitors",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Payload as single-line JSON.
    pub fn data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Server-sent-events frame for this event.
    pub fn to_sse_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }
}

/// Receiver of pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Discards every event.
pub struct SilentSink;

impl EventSink for SilentSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Forwards events into an unbounded channel.
///
/// A closed receiver (the client went away) is not an error; the run keeps
/// going and later events are dropped.
pub struct ChannelSink {
    tx: UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver closed, dropping event");
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
