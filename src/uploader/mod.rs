// Uploader module - turns media items into multipart requests and drives batches
//
// UploadClient owns the wire format and outcome classification; the queue,
// retry and progress pieces are caller-side orchestration on top of it.

pub mod multipart;
pub mod progress_tracker;
pub mod retry;
pub mod upload_client;
pub mod upload_queue;

pub use retry::{retry_failed_uploads, RetryPolicy};
pub use upload_client::{
    HttpTransport, ReqwestTransport, TransportErrorKind, UploadClient, UploadOutcome,
    UploadRequest, UploadResult,
};
pub use upload_queue::UploadQueue;
