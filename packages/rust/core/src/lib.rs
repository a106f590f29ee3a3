//! Pipeline orchestration for compete.
//!
//! Ties the extractor, analyst, search and report crates together into the
//! two-phase competitive analysis workflow, with progress reported through
//! an [`EventSink`].

pub mod bootstrap;
pub mod events;
pub mod pipeline;
pub mod replace;
pub mod workflow;

pub use bootstrap::build_pipeline;
pub use events::{
    ChannelSink, CompetitorSummary, EventSink, PipelineEvent, RecordingSink, SilentSink, Status,
    Step,
};
pub use pipeline::{NO_ANALYSES, NO_COMPETITORS, NO_REPLACEMENTS, Pipeline};
pub use workflow::{
    AnalysisOutcome, ContinueRequest, DiscoveryHandoff, ReplaceRequest, Run, StartRequest,
    WorkflowState,
};
