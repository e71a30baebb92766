// Fan-out scheduler — run every provider for an item concurrently.
//
// Each provider runs in its own tokio task so a panic is caught at the task
// boundary instead of unwinding through the caller. Every task is bounded by
// the earlier of the per-provider deadline and the per-item deadline; a task
// still running at that point is aborted and recorded as timed out.
//
// Outcomes are reported in registration order, but nothing downstream relies
// on that: the aggregator's merge is order-independent.

use std::any::Any;
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::content::ContentItem;
use crate::error::ProviderError;

use super::traits::{SignalProvider, SignalResult};

/// Everything a fan-out produced for one item.
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    /// Providers that finished with usable signals.
    pub results: Vec<SignalResult>,
    /// Providers that failed, timed out, or panicked.
    pub errors: Vec<ProviderError>,
    /// Steps that failed inside providers that still reported signals.
    pub degraded: Vec<ProviderError>,
}

impl FanOutOutcome {
    /// How many providers were dispatched.
    pub fn attempted(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    /// True when nothing produced a usable result, including when no
    /// provider was dispatched at all.
    pub fn is_total_failure(&self) -> bool {
        self.results.is_empty()
    }

    /// Provider failures followed by degraded steps, as reported to callers.
    pub fn error_strings(&self) -> Vec<String> {
        self.errors
            .iter()
            .chain(&self.degraded)
            .map(ToString::to_string)
            .collect()
    }
}

/// Deadlines applied to every fan-out.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    pub provider_timeout: Duration,
    pub item_timeout: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            item_timeout: Duration::from_secs(30),
        }
    }
}

impl Scheduler {
    pub fn new(provider_timeout: Duration, item_timeout: Duration) -> Self {
        Self {
            provider_timeout,
            item_timeout,
        }
    }

    /// Dispatch `item` to all `providers` and wait for every one of them to
    /// finish or hit its deadline. Never fails: provider problems are
    /// returned in `FanOutOutcome::errors`.
    pub async fn fan_out(
        &self,
        providers: &[Arc<dyn SignalProvider>],
        item: Arc<ContentItem>,
    ) -> FanOutOutcome {
        let start = Instant::now();
        let deadline = (start + self.provider_timeout).min(start + self.item_timeout);

        let tasks = providers
            .iter()
            .map(|provider| run_one(Arc::clone(provider), Arc::clone(&item), deadline));

        let mut outcome = FanOutOutcome::default();
        for (provider, result) in providers.iter().zip(join_all(tasks).await) {
            match result {
                Ok(mut signal) => {
                    outcome.degraded.extend(
                        signal
                            .degraded
                            .drain(..)
                            .map(|message| ProviderError::failed(provider.name(), message)),
                    );
                    outcome.results.push(signal);
                }
                Err(error) => {
                    warn!(
                        provider = %error.provider,
                        error = %error,
                        kind = %item.kind(),
                        "Signal provider failed, continuing without it"
                    );
                    outcome.errors.push(error);
                }
            }
        }

        debug!(
            kind = %item.kind(),
            succeeded = outcome.results.len(),
            failed = outcome.errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fan-out complete"
        );

        outcome
    }
}

/// Run a single provider in its own task, bounded by `deadline`.
async fn run_one(
    provider: Arc<dyn SignalProvider>,
    item: Arc<ContentItem>,
    deadline: Instant,
) -> Result<SignalResult, ProviderError> {
    let name = provider.name().to_string();

    let mut handle = tokio::spawn(async move { provider.evaluate(&item).await });

    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(Ok(mut signal))) => match signal.error.take() {
            Some(message) => Err(ProviderError::failed(&name, message)),
            None => {
                debug!(
                    provider = %name,
                    categories = ?signal.categories,
                    reasons = ?signal.flagged_reasons,
                    "Provider result"
                );
                Ok(signal)
            }
        },
        Ok(Ok(Err(e))) => Err(ProviderError::failed(&name, format!("{e:#}"))),
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                Err(ProviderError::panicked(
                    &name,
                    panic_message(join_error.into_panic()),
                ))
            } else {
                Err(ProviderError::failed(&name, "task cancelled"))
            }
        }
        Err(_elapsed) => {
            handle.abort();
            Err(ProviderError::timed_out(&name))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentTag;
    use crate::error::ProviderErrorKind;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Fixed(&'static str, f64);

    #[async_trait]
    impl SignalProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
            Ok(SignalResult::new().flagged(self.0, self.1))
        }
    }

    struct Sleepy;

    #[async_trait]
    impl SignalProvider for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }
        async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(SignalResult::new().flagged("late", 1.0))
        }
    }

    struct Panics;

    #[async_trait]
    impl SignalProvider for Panics {
        fn name(&self) -> &str {
            "panics"
        }
        async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
            panic!("detector exploded");
        }
    }

    struct SoftFailure;

    #[async_trait]
    impl SignalProvider for SoftFailure {
        fn name(&self) -> &str {
            "soft"
        }
        async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
            Ok(SignalResult::failed("could not decode"))
        }
    }

    struct Degraded;

    #[async_trait]
    impl SignalProvider for Degraded {
        fn name(&self) -> &str {
            "degraded"
        }
        async fn evaluate(&self, _item: &ContentItem) -> Result<SignalResult> {
            let mut result = SignalResult::new().flagged("negative_sentiment", 0.9);
            result.degrade("toxicity classifier failed: 503");
            Ok(result)
        }
    }

    fn item() -> Arc<ContentItem> {
        Arc::new(ContentItem::text("hello", ContentTag::Text))
    }

    #[tokio::test]
    async fn collects_all_successful_results() {
        let providers: Vec<Arc<dyn SignalProvider>> =
            vec![Arc::new(Fixed("a", 0.2)), Arc::new(Fixed("b", 0.9))];
        let outcome = Scheduler::default().fan_out(&providers, item()).await;
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.errors.is_empty());
        assert!(!outcome.is_total_failure());
    }

    #[tokio::test]
    async fn timeout_is_recorded_without_blocking_siblings() {
        let providers: Vec<Arc<dyn SignalProvider>> =
            vec![Arc::new(Sleepy), Arc::new(Fixed("quick", 0.4))];
        let scheduler = Scheduler::new(Duration::from_millis(50), Duration::from_secs(30));

        let started = std::time::Instant::now();
        let outcome = scheduler.fan_out(&providers, item()).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.errors, vec![ProviderError::timed_out("sleepy")]);
    }

    #[tokio::test]
    async fn item_deadline_caps_provider_deadline() {
        let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(Sleepy)];
        let scheduler = Scheduler::new(Duration::from_secs(60), Duration::from_millis(50));
        let outcome = scheduler.fan_out(&providers, item()).await;
        assert!(outcome.is_total_failure());
        assert_eq!(outcome.errors[0].kind, ProviderErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn panic_is_isolated_to_its_provider() {
        let providers: Vec<Arc<dyn SignalProvider>> =
            vec![Arc::new(Panics), Arc::new(Fixed("ok", 0.1))];
        let outcome = Scheduler::default().fan_out(&providers, item()).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(
            outcome.errors[0].kind,
            ProviderErrorKind::Panicked("detector exploded".to_string())
        );
    }

    #[tokio::test]
    async fn soft_failure_counts_as_error() {
        let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(SoftFailure)];
        let outcome = Scheduler::default().fan_out(&providers, item()).await;
        assert!(outcome.is_total_failure());
        assert_eq!(outcome.error_strings(), vec!["soft: could not decode"]);
    }

    #[tokio::test]
    async fn degraded_steps_keep_signals_and_are_reported() {
        let providers: Vec<Arc<dyn SignalProvider>> = vec![Arc::new(Degraded)];
        let outcome = Scheduler::default().fan_out(&providers, item()).await;
        assert!(!outcome.is_total_failure());
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.results[0].categories["negative_sentiment"], 0.9);
        assert!(outcome.results[0].degraded.is_empty());
        assert_eq!(
            outcome.error_strings(),
            vec!["degraded: toxicity classifier failed: 503"]
        );
    }

    #[tokio::test]
    async fn no_providers_is_total_failure() {
        let outcome = Scheduler::default().fan_out(&[], item()).await;
        assert_eq!(outcome.attempted(), 0);
        assert!(outcome.is_total_failure());
    }
}
