// Sentinel: signal aggregation and decision policy for content moderation
//
// This is the library root. Content flows content -> signals (registry,
// scheduler, providers) -> aggregate -> policy, with pipeline tying the
// steps together per item and per batch.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod signals;

#[cfg(feature = "web")]
pub mod web;

pub use aggregate::AggregatedResult;
pub use content::{ContentItem, ContentKind, ContentTag};
pub use error::ModerationError;
pub use pipeline::{BatchRequest, BatchResult, Moderator};
pub use policy::ModerationAction;
