//! Server-side gating of ciphertext access.
//!
//! Checks run in a fixed order (existence, expiry, exhaustion, password) and
//! each failure maps to its own HTTP status, so callers can branch on it.
//! Granting a download is not decided here: it is the conditional increment
//! in [`FileRepository::try_consume_download`](super::file_repository::FileRepository::try_consume_download).

use crate::entities::shared_files;
use crate::utils::password::verify_password;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("File not found")]
    NotFound,

    #[error("File has expired")]
    Expired,

    #[error("Download limit reached")]
    LimitReached,

    #[error("Password required")]
    PasswordRequired,

    #[error("Invalid password")]
    PasswordInvalid,
}

pub struct AccessGate;

impl AccessGate {
    /// Metadata view: existence and expiry only.
    pub fn check_view(
        record: Option<&shared_files::Model>,
        now: DateTime<Utc>,
    ) -> Result<&shared_files::Model, GateError> {
        let record = record.ok_or(GateError::NotFound)?;

        // Re-evaluated on every request; the sweeper runs on a delay.
        if record.is_expired_at(now) {
            return Err(GateError::Expired);
        }

        Ok(record)
    }

    /// Download pre-check: existence, expiry, exhaustion, then password.
    pub fn check_download<'a>(
        record: Option<&'a shared_files::Model>,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<&'a shared_files::Model, GateError> {
        let record = Self::check_view(record, now)?;

        if record.download_count >= record.max_downloads {
            return Err(GateError::LimitReached);
        }

        if let Some(hash) = record.password_hash.as_deref() {
            let supplied = password.filter(|p| !p.is_empty());
            let Some(supplied) = supplied else {
                return Err(GateError::PasswordRequired);
            };
            match verify_password(supplied, hash) {
                Ok(true) => {}
                Ok(false) => return Err(GateError::PasswordInvalid),
                Err(e) => {
                    tracing::error!("Unreadable password hash on file {}: {}", record.id, e);
                    return Err(GateError::PasswordInvalid);
                }
            }
        }

        Ok(record)
    }

    /// Explain why a conditional increment did not apply, given the record as
    /// re-read after the attempt.
    pub fn classify_rejected_grant(
        record: Option<&shared_files::Model>,
        now: DateTime<Utc>,
    ) -> GateError {
        match Self::check_view(record, now) {
            Err(e) => e,
            Ok(_) => GateError::LimitReached,
        }
    }
}
