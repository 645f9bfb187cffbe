use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::errors::{AppError, AppResult};
use crate::media::MediaItem;
use crate::security::InputValidator;

use super::multipart::MultipartBody;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A fully built upload request, ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: Url,
    pub authorization: String,
    pub body: MultipartBody,
}

/// Sends a built request and reports the HTTP status it got back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: UploadRequest) -> AppResult<u16>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: UploadRequest) -> AppResult<u16> {
        let content_type = request.body.content_type();

        let response = self
            .client
            .post(request.url)
            .header(AUTHORIZATION, request.authorization)
            .header(CONTENT_TYPE, content_type)
            .body(request.body.into_bytes())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::debug!(
                "Server answered {} (first 300 chars): {}",
                status,
                error_text.chars().take(300).collect::<String>()
            );
        }

        Ok(status.as_u16())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The request URL could not be built; nothing was sent.
    InvalidUrl,
    Connect,
    Timeout,
    Cancelled,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UploadOutcome {
    Success,
    HttpError(u16),
    TransportError {
        kind: TransportErrorKind,
        message: String,
    },
}

impl UploadOutcome {
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            UploadOutcome::Success
        } else {
            UploadOutcome::HttpError(status)
        }
    }

    pub fn from_error(error: &AppError) -> Self {
        let kind = match error {
            AppError::InvalidServerUrl { .. } => TransportErrorKind::InvalidUrl,
            AppError::UploadCancelled { .. } => TransportErrorKind::Cancelled,
            AppError::Network(e) if e.is_timeout() => TransportErrorKind::Timeout,
            AppError::Network(e) if e.is_connect() => TransportErrorKind::Connect,
            _ => TransportErrorKind::Other,
        };

        UploadOutcome::TransportError {
            kind,
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success)
    }

    /// Whether a caller-driven retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadOutcome::Success => false,
            UploadOutcome::HttpError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            UploadOutcome::TransportError { kind, .. } => {
                matches!(kind, TransportErrorKind::Connect | TransportErrorKind::Timeout)
            }
        }
    }
}

impl std::fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadOutcome::Success => write!(f, "uploaded"),
            UploadOutcome::HttpError(status) => write!(f, "server returned HTTP {}", status),
            UploadOutcome::TransportError { message, .. } => write!(f, "{}", message),
        }
    }
}

/// Outcome of one item's upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub item_id: Uuid,
    pub filename: String,
    pub outcome: UploadOutcome,
}

impl UploadResult {
    pub fn new(item: &MediaItem, outcome: UploadOutcome) -> Self {
        Self {
            item_id: item.id(),
            filename: item.filename().to_string(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Builds and sends one multipart upload per media item.
pub struct UploadClient<T = ReqwestTransport> {
    transport: T,
}

impl UploadClient<ReqwestTransport> {
    pub fn new() -> AppResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> AppResult<Self> {
        Ok(Self::with_transport(ReqwestTransport::new(timeout)?))
    }
}

impl<T: HttpTransport> UploadClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Uploads `item` to `<server>/upload`. Never fails: every problem ends up
    /// in the returned result.
    pub async fn upload(&self, item: &MediaItem, config: &UploadConfig) -> UploadResult {
        let outcome = match self.send(item, config).await {
            Ok(status) => UploadOutcome::from_status(status),
            Err(e) => UploadOutcome::from_error(&e),
        };

        self.log_outcome(item, &outcome);
        UploadResult::new(item, outcome)
    }

    /// Same as [`upload`](Self::upload), but gives up with a `Cancelled`
    /// transport error as soon as `cancel` fires.
    pub async fn upload_cancellable(
        &self,
        item: &MediaItem,
        config: &UploadConfig,
        cancel: &CancellationToken,
    ) -> UploadResult {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::upload_cancelled(item.filename())),
            sent = self.send(item, config) => sent,
        };

        let outcome = match sent {
            Ok(status) => UploadOutcome::from_status(status),
            Err(e) => UploadOutcome::from_error(&e),
        };

        self.log_outcome(item, &outcome);
        UploadResult::new(item, outcome)
    }

    async fn send(&self, item: &MediaItem, config: &UploadConfig) -> AppResult<u16> {
        let url = InputValidator::validate_server_url(&config.server_base_url)?;
        let body = MultipartBody::for_item(item);

        log::debug!(
            "POST {} ({}, {} byte body, boundary {})",
            url,
            item.filename(),
            body.as_bytes().len(),
            body.boundary()
        );

        let request = UploadRequest {
            url,
            authorization: format!("Bearer {}", config.api_token),
            body,
        };

        self.transport.post(request).await
    }

    fn log_outcome(&self, item: &MediaItem, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Success => log::info!("Uploaded {}", item.filename()),
            other => log::warn!("Upload of {} failed: {}", item.filename(), other),
        }
    }
}
