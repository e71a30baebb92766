// Signal providers — independent detectors that each report category scores
// and flagged reasons for one content item.
//
// `registry` decides which providers run for a content kind, `scheduler` runs
// them concurrently under deadlines, and the `text` / `image` submodules hold
// the providers themselves.

pub mod image;
pub mod registry;
pub mod scheduler;
pub mod text;
pub mod traits;

pub use registry::{Collaborators, ProviderRegistry};
pub use scheduler::{FanOutOutcome, Scheduler};
pub use traits::{SignalProvider, SignalResult};
