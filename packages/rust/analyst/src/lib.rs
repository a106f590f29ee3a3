//! Knowledge query client for compete.
//!
//! Wraps a text-completion backend ([`CompletionProvider`]) with prompt
//! templates, tolerant JSON decoding and competitor screening. The
//! [`Analyst`] is the entry point the pipeline uses.

pub mod analyst;
pub mod discovery;
pub mod json;
pub mod prompts;
pub mod provider;

pub use analyst::{Analyst, DEFAULT_MAX_TOKENS};
pub use discovery::{SelfMatch, screen_candidates};
pub use json::decode;
pub use prompts::{Prompt, PromptKind};
pub use provider::{AnthropicClient, CompletionProvider, ScriptedProvider};
