//! Upload client for the LocalPictureSaver server.
//!
//! Each [`MediaItem`] becomes one `POST <server>/upload` carrying a single
//! multipart `files` part and a bearer token. Every submitted item yields
//! exactly one [`UploadResult`].

pub mod config;
pub mod errors;
pub mod media;
pub mod security;
pub mod uploader;

pub use config::UploadConfig;
pub use errors::{AppError, AppResult};
pub use media::{MediaItem, MediaKind};
pub use uploader::{UploadClient, UploadOutcome, UploadQueue, UploadResult};
