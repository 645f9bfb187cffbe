use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::upload_client::UploadResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub item_id: Uuid,
    pub filename: String,
    pub error: String,
    pub retry_count: u32,
    pub is_retryable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub total_items: usize,
    pub completed: usize,
    pub current_item: Option<String>,
    pub successful_uploads: Vec<String>,
    pub failed_uploads: Vec<FailedUpload>,
    pub session_status: SessionStatus,
}

impl UploadProgress {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            completed: 0,
            current_item: None,
            successful_uploads: Vec::new(),
            failed_uploads: Vec::new(),
            session_status: SessionStatus::InProgress,
        }
    }

    /// "N of M uploaded"
    pub fn summary(&self) -> String {
        format!(
            "{} of {} uploaded",
            self.successful_uploads.len(),
            self.total_items
        )
    }
}

/// Progress shared between the batch driver and whoever displays it.
pub type ProgressState = Arc<Mutex<UploadProgress>>;

pub fn new_progress_state(total_items: usize) -> ProgressState {
    Arc::new(Mutex::new(UploadProgress::new(total_items)))
}

/// Applies `f` to the progress record. A poisoned lock is logged and skipped
/// so reporting can never abort an upload.
pub fn safe_progress_update<F>(progress_state: &ProgressState, operation: &str, f: F) -> bool
where
    F: FnOnce(&mut UploadProgress),
{
    match progress_state.lock() {
        Ok(mut progress) => {
            f(&mut progress);
            true
        }
        Err(e) => {
            log::error!(
                "Failed to acquire progress lock for {} (non-critical): {}",
                operation,
                e
            );
            false
        }
    }
}

pub fn safe_progress_read<F, R>(progress_state: &ProgressState, operation: &str, f: F) -> Option<R>
where
    F: FnOnce(&UploadProgress) -> R,
{
    match progress_state.lock() {
        Ok(progress) => Some(f(&progress)),
        Err(e) => {
            log::error!(
                "Failed to acquire progress lock for {} (non-critical): {}",
                operation,
                e
            );
            None
        }
    }
}

pub fn update_progress_current(progress_state: &ProgressState, filename: &str) {
    safe_progress_update(progress_state, "current item update", |progress| {
        progress.current_item = Some(filename.to_string());
        log::debug!("Progress: currently uploading {}", filename);
    });
}

/// Records a finished upload, success or failure.
pub fn record_result(progress_state: &ProgressState, result: &UploadResult) {
    if result.is_success() {
        update_progress_success(progress_state, result);
    } else {
        update_progress_failure(progress_state, result);
    }
}

fn update_progress_success(progress_state: &ProgressState, result: &UploadResult) {
    safe_progress_update(progress_state, "success update", |progress| {
        let before = progress.failed_uploads.len();
        progress
            .failed_uploads
            .retain(|f| f.item_id != result.item_id);

        // A retried item was already counted when it first failed.
        if progress.failed_uploads.len() == before {
            progress.completed += 1;
        }
        progress.successful_uploads.push(result.filename.clone());

        log::info!(
            "Progress: uploaded {} ({}/{})",
            result.filename,
            progress.completed,
            progress.total_items
        );
    });
}

fn update_progress_failure(progress_state: &ProgressState, result: &UploadResult) {
    safe_progress_update(progress_state, "failure update", |progress| {
        let error = result.outcome.to_string();
        let is_retryable = result.outcome.is_retryable();

        if let Some(existing) = progress
            .failed_uploads
            .iter_mut()
            .find(|f| f.item_id == result.item_id)
        {
            existing.retry_count += 1;
            existing.error = error.clone();
            existing.is_retryable = is_retryable;
        } else {
            progress.completed += 1;
            progress.failed_uploads.push(FailedUpload {
                item_id: result.item_id,
                filename: result.filename.clone(),
                error: error.clone(),
                retry_count: 0,
                is_retryable,
            });
        }

        log::warn!(
            "Progress: failed to upload {} - {} ({}/{})",
            result.filename,
            error,
            progress.completed,
            progress.total_items
        );
    });
}

/// Counts a selected file that never became an upload, so the summary still
/// covers the whole selection.
pub fn record_unreadable(progress_state: &ProgressState, filename: &str, error: &str) {
    safe_progress_update(progress_state, "unreadable file", |progress| {
        progress.completed += 1;
        progress.failed_uploads.push(FailedUpload {
            item_id: Uuid::nil(),
            filename: filename.to_string(),
            error: error.to_string(),
            retry_count: 0,
            is_retryable: false,
        });

        log::warn!(
            "Progress: skipped {} - {} ({}/{})",
            filename,
            error,
            progress.completed,
            progress.total_items
        );
    });
}

pub fn mark_session_completed(progress_state: &ProgressState) {
    safe_progress_update(progress_state, "mark completed", |progress| {
        progress.session_status = SessionStatus::Completed;
        progress.current_item = None;

        log::info!(
            "Session completed: {}/{} successful, {} failed",
            progress.successful_uploads.len(),
            progress.total_items,
            progress.failed_uploads.len()
        );
    });
}

pub fn mark_session_cancelled(progress_state: &ProgressState) {
    safe_progress_update(progress_state, "mark cancelled", |progress| {
        progress.session_status = SessionStatus::Cancelled;
        progress.current_item = None;

        log::info!(
            "Session cancelled with {} of {} items completed",
            progress.completed,
            progress.total_items
        );
    });
}
