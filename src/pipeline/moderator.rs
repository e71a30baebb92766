// Moderator — the entry point that owns the provider table, the scheduler
// deadlines, and the fetcher used for URL submissions.

use std::sync::Arc;

use tracing::info;

use crate::aggregate::{aggregate, AggregatedResult};
use crate::content::{ContentItem, ContentKind, ContentTag};
use crate::error::ModerationError;
use crate::fetch::ContentFetcher;
use crate::signals::{ProviderRegistry, Scheduler};

use super::batch::{BatchRequest, BatchResult, ImageSource};

/// Cheap to clone: the registry and fetcher are shared.
#[derive(Clone)]
pub struct Moderator {
    registry: Arc<ProviderRegistry>,
    scheduler: Scheduler,
    fetcher: Option<Arc<dyn ContentFetcher>>,
}

impl Moderator {
    pub fn new(registry: ProviderRegistry, scheduler: Scheduler) -> Self {
        Self {
            registry: Arc::new(registry),
            scheduler,
            fetcher: None,
        }
    }

    /// Enable URL submissions.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Evaluate one item. Provider failures never surface as errors here:
    /// they are listed in the result, and total failure fails closed.
    pub async fn moderate(&self, item: ContentItem) -> AggregatedResult {
        let kind = item.kind();
        let tag = item.tag;
        let providers = self.registry.providers_for(kind);
        let outcome = self.scheduler.fan_out(providers, Arc::new(item)).await;
        let result = aggregate(kind, outcome);

        info!(
            kind = %kind,
            content_type = %tag,
            action = %result.moderation_action,
            confidence = result.confidence,
            reasons = ?result.flagged_reasons,
            provider_errors = result.errors.as_ref().map_or(0, Vec::len),
            "Content moderated"
        );

        result
    }

    pub async fn moderate_text(
        &self,
        content: &str,
        tag: ContentTag,
    ) -> Result<AggregatedResult, ModerationError> {
        if content.trim().is_empty() {
            return Err(ModerationError::validation("content must not be empty"));
        }
        Ok(self.moderate(ContentItem::text(content, tag)).await)
    }

    pub async fn moderate_image(
        &self,
        source: ImageSource,
    ) -> Result<AggregatedResult, ModerationError> {
        let item = self.resolve(source).await?;
        Ok(self.moderate(item).await)
    }

    /// Turn an image source into a decoded item, fetching URLs first.
    /// Decoding runs on the blocking pool.
    pub async fn resolve(&self, source: ImageSource) -> Result<ContentItem, ModerationError> {
        let decode = match source {
            ImageSource::Bytes(bytes) => {
                tokio::task::spawn_blocking(move || ContentItem::image(&bytes))
            }
            ImageSource::Url(url) => {
                let fetcher = self.fetcher.as_ref().ok_or_else(|| {
                    ModerationError::validation("URL submissions are not enabled")
                })?;
                let fetched = fetcher.fetch(&url).await?;
                tokio::task::spawn_blocking(move || fetched.into_item())
            }
        };

        decode
            .await
            .map_err(|e| ModerationError::Internal(format!("image decoding task failed: {e}")))?
    }

    /// Evaluate every item in a batch concurrently.
    pub async fn moderate_batch(
        &self,
        request: BatchRequest,
    ) -> Result<BatchResult, ModerationError> {
        let BatchRequest { text, image } = request;

        let text_task = async {
            match text {
                Some(text) => Some(self.moderate_text(&text.content, text.content_type).await),
                None => None,
            }
        };
        let image_task = async {
            match image {
                Some(source) => {
                    let item = self.resolve(source).await?;
                    let kind = item.kind();
                    Ok::<_, ModerationError>(Some((kind, self.moderate(item).await)))
                }
                None => Ok(None),
            }
        };

        let (text_result, image_result) = tokio::join!(text_task, image_task);

        let mut batch = BatchResult::default();
        if let Some(result) = text_result {
            batch.insert(ContentKind::Text, result?);
        }
        if let Some((kind, result)) = image_result? {
            batch.insert(kind, result);
        }
        Ok(batch.finish())
    }
}
