// Moderation pipeline — per-item evaluation and the batch coordinator.
//
// An item is dispatched to the providers registered for its kind, the
// results are merged, and the policy assigns an action. A batch runs that
// independently for each item it carries and folds the verdicts into one
// overall decision.

pub mod batch;
pub mod moderator;

pub use batch::{BatchRequest, BatchResult, ImageSource, OverallDecision, TextRequest};
pub use moderator::Moderator;
