use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::UploadConfig;
use crate::errors::{AppError, AppResult};
use crate::media::MediaItem;
use crate::security::MAX_SELECTION;

use super::progress_tracker::{
    mark_session_cancelled, mark_session_completed, record_result, update_progress_current,
    ProgressState,
};
use super::upload_client::{HttpTransport, ReqwestTransport, UploadClient, UploadResult};

/// Drives a batch of uploads. Sequential unless a concurrency above one is
/// requested; results always come back in input order.
pub struct UploadQueue<T = ReqwestTransport> {
    client: UploadClient<T>,
    concurrency: usize,
    cancel: CancellationToken,
    progress: Option<ProgressState>,
}

impl<T: HttpTransport> UploadQueue<T> {
    pub fn new(client: UploadClient<T>) -> Self {
        Self {
            client,
            concurrency: 1,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_SELECTION);
        self
    }

    pub fn with_progress(mut self, progress: ProgressState) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Token that cancels every pending and in-flight upload of this queue.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn progress(&self) -> Option<&ProgressState> {
        self.progress.as_ref()
    }

    /// Uploads every item and returns one result per item, in input order.
    ///
    /// `config` is captured by value so a settings change mid-batch cannot
    /// reach requests that are already queued.
    pub async fn process(
        &self,
        items: &[MediaItem],
        config: UploadConfig,
    ) -> AppResult<Vec<UploadResult>> {
        if items.is_empty() {
            return Err(AppError::EmptyBatch);
        }

        let start_time = Instant::now();
        log::info!(
            "Uploading {} item(s) to {} (concurrency {})",
            items.len(),
            config.server_base_url,
            self.concurrency
        );

        let results = if self.concurrency == 1 {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(self.upload_one(item, &config).await);
            }
            results
        } else {
            stream::iter(items)
                .map(|item| self.upload_one(item, &config))
                .buffered(self.concurrency)
                .collect::<Vec<_>>()
                .await
        };

        if let Some(progress) = &self.progress {
            if self.cancel.is_cancelled() {
                mark_session_cancelled(progress);
            } else {
                mark_session_completed(progress);
            }
        }

        log::info!(
            "Batch finished in {:.1}s: {} of {} uploaded",
            start_time.elapsed().as_secs_f64(),
            results.iter().filter(|r| r.is_success()).count(),
            results.len()
        );

        Ok(results)
    }

    pub(crate) async fn upload_one(&self, item: &MediaItem, config: &UploadConfig) -> UploadResult {
        if let Some(progress) = &self.progress {
            update_progress_current(progress, item.filename());
        }

        let result = self
            .client
            .upload_cancellable(item, config, &self.cancel)
            .await;

        if let Some(progress) = &self.progress {
            record_result(progress, &result);
        }

        result
    }
}
