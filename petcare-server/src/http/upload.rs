//! Multipart upload extraction and validation

use axum::extract::Multipart;
use axum::body::Bytes;

use crate::error::ApiError;

const MB: usize = 1024 * 1024;

/// Size cap for image and audio uploads
pub const MAX_FILE_SIZE: usize = 20 * MB;
/// Size cap for video uploads
pub const MAX_VIDEO_SIZE: usize = 100 * MB;

/// Name of the multipart part carrying the upload
pub const FILE_FIELD: &str = "file";

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const AUDIO_TYPES: &[&str] = &[
    "audio/wav",
    "audio/wave",
    "audio/mpeg",
    "audio/mp3",
    "audio/webm",
];
const VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

/// Kind of media an endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Audio,
    Video,
}

impl UploadKind {
    /// Accepted content types
    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => IMAGE_TYPES,
            UploadKind::Audio => AUDIO_TYPES,
            UploadKind::Video => VIDEO_TYPES,
        }
    }

    /// Maximum accepted size in bytes
    pub fn max_size(self) -> usize {
        match self {
            UploadKind::Video => MAX_VIDEO_SIZE,
            _ => MAX_FILE_SIZE,
        }
    }

    fn too_large(self) -> String {
        let noun = match self {
            UploadKind::Video => "Video",
            _ => "File",
        };
        format!("{noun} too large. Max size: {} MB", self.max_size() / MB)
    }

    fn invalid_type(self) -> String {
        format!("Invalid file type. Allowed: {}", self.allowed().join(", "))
    }
}

/// A validated upload
#[derive(Debug)]
pub struct Upload {
    /// File contents
    pub bytes: Bytes,
    /// Effective content type (declared or guessed)
    pub content_type: String,
    /// Client-supplied file name
    pub file_name: Option<String>,
}

/// Effective content type of a part.
///
/// Parameters such as `;codecs=opus` are dropped. A missing or
/// `application/octet-stream` type is guessed from the file name.
pub fn effective_content_type(declared: Option<&str>, file_name: Option<&str>) -> Option<String> {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    declared.or_else(|| {
        file_name
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string)
    })
}

/// Check content type and size against what `kind` accepts.
pub fn validate(
    kind: UploadKind,
    declared: Option<&str>,
    file_name: Option<&str>,
    len: usize,
) -> Result<String, ApiError> {
    let content_type = effective_content_type(declared, file_name)
        .filter(|ct| kind.allowed().contains(&ct.as_str()))
        .ok_or_else(|| ApiError::BadRequest(kind.invalid_type()))?;

    if len > kind.max_size() {
        return Err(ApiError::BadRequest(kind.too_large()));
    }

    Ok(content_type)
}

/// Read the `file` part from a multipart body and validate it.
pub async fn read_upload(mut multipart: Multipart, kind: UploadKind) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;

        let content_type = validate(kind, declared.as_deref(), file_name.as_deref(), bytes.len())
            .inspect_err(|err| {
                tracing::warn!(
                    ?kind,
                    declared = ?declared,
                    file_name = ?file_name,
                    size = bytes.len(),
                    "rejected upload: {}",
                    err
                );
            })?;

        return Ok(Upload {
            bytes,
            content_type,
            file_name,
        });
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}
