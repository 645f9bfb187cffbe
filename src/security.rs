use regex::Regex;
use reqwest::Url;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};
use crate::media::MediaKind;

/// Largest selection the picker hands over in one go.
pub const MAX_SELECTION: usize = 10;

/// Sanitised names from disk are cut down to this many characters.
const MAX_FILENAME_CHARS: usize = 255;

fn header_breaking_chars() -> AppResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    PATTERN
        .get_or_init(|| Regex::new(r#"["\x00-\x1f\x7f]"#))
        .as_ref()
        .map_err(|e| AppError::Internal(format!("filename pattern: {}", e)))
}

pub struct InputValidator;

impl InputValidator {
    /// Builds `<base>/upload` and checks it is an absolute http(s) URL.
    pub fn validate_server_url(base: &str) -> AppResult<Url> {
        let trimmed = base.trim();

        if trimmed.is_empty() {
            return Err(AppError::invalid_server_url(base, "server address is empty"));
        }

        let base_url = Url::parse(trimmed).map_err(|e| AppError::invalid_server_url(base, e))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::invalid_server_url(
                base,
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        if base_url.host_str().map_or(true, str::is_empty) {
            return Err(AppError::invalid_server_url(base, "missing host"));
        }

        // Not a literal `base + "/upload"`: trailing slashes are dropped first so
        // `http://host:8000/` posts to `/upload`, not `//upload`.
        let target = format!("{}/upload", trimmed.trim_end_matches('/'));
        Url::parse(&target).map_err(|e| AppError::invalid_server_url(base, e))
    }

    /// Filenames end up inside a quoted Content-Disposition parameter, so
    /// quotes and control characters would break the part headers.
    pub fn validate_filename(filename: &str) -> AppResult<()> {
        if filename.is_empty() {
            return Err(AppError::validation("filename", "Filename cannot be empty"));
        }

        if header_breaking_chars()?.is_match(filename) {
            return Err(AppError::validation(
                "filename",
                "Filename contains quotes or control characters",
            ));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        let sanitized: String = filename
            .trim()
            .chars()
            .map(|c| if c == '"' || c.is_control() { '_' } else { c })
            .collect();

        if sanitized.chars().count() > MAX_FILENAME_CHARS {
            let head: String = sanitized.chars().take(MAX_FILENAME_CHARS - 3).collect();
            format!("{}...", head)
        } else {
            sanitized
        }
    }

    pub fn validate_media_path(path: &str) -> AppResult<MediaKind> {
        if path.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        let path_obj = Path::new(path);

        let kind = match path_obj.extension() {
            Some(extension) => MediaKind::from_extension(&extension.to_string_lossy())
                .ok_or_else(|| AppError::invalid_file_type(path))?,
            None => {
                return Err(AppError::validation(
                    "file_path",
                    "File must have an extension",
                ))
            }
        };

        if !path_obj.exists() {
            return Err(AppError::file_not_found(path));
        }

        if !path_obj.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        Ok(kind)
    }

    pub fn validate_selection_size(count: usize) -> AppResult<()> {
        if count == 0 || count > MAX_SELECTION {
            return Err(AppError::validation(
                "selection",
                &format!("Must select between 1 and {} items", MAX_SELECTION),
            ));
        }

        Ok(())
    }
}
