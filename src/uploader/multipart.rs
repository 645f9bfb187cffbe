// multipart/form-data framing for a single `files` part
//
// Servers built against the mobile app expect this exact byte layout, so the
// body is assembled by hand instead of through reqwest's form builder.

use uuid::Uuid;

use crate::media::MediaItem;

/// Form field every upload is sent under.
pub const FIELD_NAME: &str = "files";

const MAX_BOUNDARY_ATTEMPTS: usize = 8;

/// Fully buffered request body plus the boundary that frames it.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Frames `item` with a fresh boundary that does not occur in its payload.
    pub fn for_item(item: &MediaItem) -> Self {
        let boundary = fresh_boundary_for(item.payload());
        Self::with_boundary(item, boundary)
    }

    pub fn with_boundary(item: &MediaItem, boundary: String) -> Self {
        let payload = item.payload();
        let mut bytes = Vec::with_capacity(payload.len() + 2 * boundary.len() + 160);

        bytes.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                FIELD_NAME,
                item.filename()
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", item.mime_type()).as_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Self { boundary, bytes }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// 36-character uppercase UUID string.
pub fn generate_boundary() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

fn fresh_boundary_for(payload: &[u8]) -> String {
    let mut boundary = generate_boundary();

    for _ in 1..MAX_BOUNDARY_ATTEMPTS {
        if !contains_subslice(payload, boundary.as_bytes()) {
            break;
        }
        log::debug!("Boundary collided with payload content, regenerating");
        boundary = generate_boundary();
    }

    boundary
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}
