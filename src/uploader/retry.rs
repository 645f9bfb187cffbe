use std::cmp::min;
use tokio::time::{sleep, Duration};

use crate::config::UploadConfig;
use crate::media::MediaItem;

use super::progress_tracker::{mark_session_cancelled, safe_progress_read};
use super::upload_client::{HttpTransport, UploadResult};
use super::upload_queue::UploadQueue;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(120),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry round `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay.as_millis() as f64
            * self.exponential_base.powi(attempt.max(1) as i32 - 1);

        let delay = Duration::from_millis(delay_ms as u64);
        min(delay, self.max_delay)
    }
}

/// Re-uploads the items whose previous outcome is retryable, replacing their
/// results in place. Items that succeeded or failed permanently are left
/// alone, so the returned vector keeps its length and order.
pub async fn retry_failed_uploads<T: HttpTransport>(
    queue: &UploadQueue<T>,
    items: &[MediaItem],
    mut results: Vec<UploadResult>,
    config: &UploadConfig,
    policy: &RetryPolicy,
) -> Vec<UploadResult> {
    let cancel = queue.cancellation_token();

    for attempt in 1..=policy.max_retries {
        let pending: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.outcome.is_retryable())
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() || cancel.is_cancelled() {
            break;
        }

        let delay = policy.backoff_delay(attempt);
        log::warn!(
            "Retry round {} of {}: {} item(s), waiting {:?}",
            attempt,
            policy.max_retries,
            pending.len(),
            delay
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(delay) => {}
        }

        for index in pending {
            let item_id = results[index].item_id;
            let Some(item) = items.iter().find(|item| item.id() == item_id) else {
                log::error!(
                    "No media item for result {} ({}), skipping retry",
                    item_id,
                    results[index].filename
                );
                continue;
            };

            results[index] = queue.upload_one(item, config).await;
        }
    }

    if let Some(progress) = queue.progress() {
        // The first pass already marked the session completed.
        if cancel.is_cancelled() {
            mark_session_cancelled(progress);
        }

        safe_progress_read(progress, "retry summary", |p| {
            log::info!("After retries: {}", p.summary());
        });
    }

    results
}
