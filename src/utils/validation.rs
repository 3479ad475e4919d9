use crate::config::ShareConfig;
use std::str::FromStr;
use thiserror::Error;

/// Applied when the sender omits `max_downloads`.
pub const DEFAULT_MAX_DOWNLOADS: i32 = 1;
/// Applied when the sender omits `expiry_hours`.
pub const DEFAULT_EXPIRY_HOURS: i64 = 24;

const MAX_NAME_LEN: usize = 255;
const MAX_MIME_LEN: usize = 255;
/// Exported keys are small JSON objects; anything larger is not a key.
const MAX_EXPORTED_KEY_LEN: usize = 4096;
const MAX_NONCE_LEN: usize = 256;
/// Slack for AEAD tags and client framing on top of the plaintext size.
const CIPHERTEXT_OVERHEAD: usize = 1024;

/// An upload parameter outside its bounds. `field` names the first failing
/// parameter in the order they are checked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Upload parameters as supplied by the sender.
#[derive(Debug, Clone)]
pub struct UploadParams {
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub exported_key: String,
    pub nonce: String,
    pub max_downloads: i32,
    pub expiry_hours: i64,
}

/// Form fields of an upload exactly as received, before any parsing.
#[derive(Debug, Default)]
pub struct RawUploadFields {
    pub original_name: Option<String>,
    pub size_bytes: Option<String>,
    pub mime_type: Option<String>,
    pub exported_key: Option<String>,
    pub nonce: Option<String>,
    pub max_downloads: Option<String>,
    pub expiry_hours: Option<String>,
}

impl RawUploadFields {
    /// Parse and check every field in the same order as [`validate_upload`],
    /// so a malformed number never masks an earlier failing field.
    pub fn parse(
        self,
        ciphertext_len: usize,
        config: &ShareConfig,
    ) -> Result<UploadParams, ValidationError> {
        let original_name = required("original_name", self.original_name)?;
        check_name(&original_name)?;

        let size_bytes = parse_int("size_bytes", &required("size_bytes", self.size_bytes)?)?;
        check_size(size_bytes, config)?;

        let mime_type = required("mime_type", self.mime_type)?;
        check_mime(&mime_type)?;

        let exported_key = required("exported_key", self.exported_key)?;
        check_exported_key(&exported_key)?;

        let nonce = required("nonce", self.nonce)?;
        check_nonce(&nonce)?;

        let max_downloads = match self.max_downloads {
            Some(raw) => parse_int("max_downloads", &raw)?,
            None => DEFAULT_MAX_DOWNLOADS,
        };
        check_max_downloads(max_downloads, config)?;

        let expiry_hours = match self.expiry_hours {
            Some(raw) => parse_int("expiry_hours", &raw)?,
            None => DEFAULT_EXPIRY_HOURS,
        };
        check_expiry_hours(expiry_hours, config)?;

        check_ciphertext(ciphertext_len, config)?;

        Ok(UploadParams {
            original_name,
            size_bytes,
            mime_type,
            exported_key,
            nonce,
            max_downloads,
            expiry_hours,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    value.ok_or_else(|| ValidationError::new(field, "is required"))
}

fn parse_int<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::new(field, "must be an integer"))
}

/// Validate upload parameters in a fixed order and report the first failure.
pub fn validate_upload(
    params: &UploadParams,
    ciphertext_len: usize,
    config: &ShareConfig,
) -> Result<(), ValidationError> {
    check_name(&params.original_name)?;
    check_size(params.size_bytes, config)?;
    check_mime(&params.mime_type)?;
    check_exported_key(&params.exported_key)?;
    check_nonce(&params.nonce)?;
    check_max_downloads(params.max_downloads, config)?;
    check_expiry_hours(params.expiry_hours, config)?;
    check_ciphertext(ciphertext_len, config)
}

fn check_name(original_name: &str) -> Result<(), ValidationError> {
    let name = original_name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("original_name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "original_name",
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new(
            "original_name",
            "must not contain control characters",
        ));
    }
    Ok(())
}

fn check_size(size_bytes: i64, config: &ShareConfig) -> Result<(), ValidationError> {
    if size_bytes < 1 {
        return Err(ValidationError::new("size_bytes", "must be at least 1 byte"));
    }
    if size_bytes as u64 > config.max_file_size as u64 {
        return Err(ValidationError::new(
            "size_bytes",
            format!(
                "file size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size_bytes,
                config.max_file_size,
                config.max_file_size / 1024 / 1024
            ),
        ));
    }
    Ok(())
}

fn check_mime(mime_type: &str) -> Result<(), ValidationError> {
    if mime_type.is_empty() || mime_type.len() > MAX_MIME_LEN {
        return Err(ValidationError::new(
            "mime_type",
            format!("must be between 1 and {} characters", MAX_MIME_LEN),
        ));
    }
    Ok(())
}

// Key and nonce are opaque; only their presence and size are checked.
fn check_exported_key(exported_key: &str) -> Result<(), ValidationError> {
    if exported_key.is_empty() || exported_key.len() > MAX_EXPORTED_KEY_LEN {
        return Err(ValidationError::new(
            "exported_key",
            format!("must be between 1 and {} bytes", MAX_EXPORTED_KEY_LEN),
        ));
    }
    Ok(())
}

fn check_nonce(nonce: &str) -> Result<(), ValidationError> {
    if nonce.is_empty() || nonce.len() > MAX_NONCE_LEN {
        return Err(ValidationError::new(
            "nonce",
            format!("must be between 1 and {} bytes", MAX_NONCE_LEN),
        ));
    }
    Ok(())
}

fn check_max_downloads(max_downloads: i32, config: &ShareConfig) -> Result<(), ValidationError> {
    if max_downloads < 1 || max_downloads > config.max_downloads_ceiling {
        return Err(ValidationError::new(
            "max_downloads",
            format!("must be between 1 and {}", config.max_downloads_ceiling),
        ));
    }
    Ok(())
}

fn check_expiry_hours(expiry_hours: i64, config: &ShareConfig) -> Result<(), ValidationError> {
    if expiry_hours < 1 || expiry_hours > config.max_expiry_hours {
        return Err(ValidationError::new(
            "expiry_hours",
            format!("must be between 1 and {}", config.max_expiry_hours),
        ));
    }
    Ok(())
}

fn check_ciphertext(ciphertext_len: usize, config: &ShareConfig) -> Result<(), ValidationError> {
    if ciphertext_len == 0 {
        return Err(ValidationError::new("file", "no ciphertext uploaded"));
    }
    if ciphertext_len > config.max_file_size + CIPHERTEXT_OVERHEAD {
        return Err(ValidationError::new(
            "file",
            "ciphertext exceeds the maximum allowed size",
        ));
    }
    Ok(())
}
