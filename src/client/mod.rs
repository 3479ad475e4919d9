//! Device-side half of the system: encryption happens here, before any byte
//! leaves the sender, and decryption happens here after download.

pub mod cipher;
pub mod key_export;

use crate::client::cipher::{CipherEngine, CryptoError};
use crate::client::key_export::{export_key, import_key};
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body. `code` is its machine-readable
    /// code, e.g. `LIMIT_REACHED` or `PASSWORD_REQUIRED`.
    #[error("server error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("malformed server response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Sender-chosen limits for a new share.
#[derive(Clone)]
pub struct UploadOptions {
    pub max_downloads: i32,
    pub expiry_hours: i64,
    pub password: Option<Zeroizing<String>>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_downloads: 1,
            expiry_hours: 24,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedShare {
    pub id: String,
    pub expires_at: DateTime<Utc>,
    pub share_url: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFileInfo {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub download_count: i32,
    pub max_downloads: i32,
    pub is_expired: bool,
    pub requires_password: bool,
}

#[derive(Deserialize)]
struct DownloadPayload {
    original_name: String,
    mime_type: String,
    exported_key: Zeroizing<String>,
    nonce: String,
    download_count: i32,
    max_downloads: i32,
    encrypted_data: String,
}

#[derive(Serialize)]
struct DownloadBody<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

/// A decrypted download.
pub struct DownloadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub download_count: i32,
    pub max_downloads: i32,
    pub plaintext: Zeroizing<Vec<u8>>,
}

/// HTTP client that seals files before upload and opens them after download.
#[derive(Clone)]
pub struct ShareClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ShareClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            token: None,
        })
    }

    /// Attribute uploads to an owner.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ClientResult<T> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => (err.code, err.error),
                Err(_) => ("UNKNOWN".to_string(), body),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Encrypt `plaintext` under a fresh key and upload the ciphertext with
    /// its exported key and nonce. The plaintext is wiped once sealed.
    pub async fn upload(
        &self,
        plaintext: Vec<u8>,
        original_name: &str,
        mime_type: &str,
        options: &UploadOptions,
    ) -> ClientResult<UploadedShare> {
        let plaintext = Zeroizing::new(plaintext);
        let size_bytes = plaintext.len();
        let sealed = CipherEngine::encrypt(&plaintext)?;
        drop(plaintext);

        let exported_key = export_key(&sealed.key);
        let nonce = base64::engine::general_purpose::STANDARD.encode(sealed.nonce);

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(sealed.ciphertext).file_name("ciphertext.bin"),
            )
            .text("original_name", original_name.to_string())
            .text("size_bytes", size_bytes.to_string())
            .text("mime_type", mime_type.to_string())
            .text("exported_key", exported_key)
            .text("nonce", nonce)
            .text("max_downloads", options.max_downloads.to_string())
            .text("expiry_hours", options.expiry_hours.to_string());

        // The form takes ownership of its text, so the password is copied
        // exactly once into the request body.
        if let Some(password) = &options.password {
            form = form.text("password", password.as_str().to_owned());
        }

        let url = self.url("/api/files/upload")?;
        self.send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn info(&self, id: &str) -> ClientResult<RemoteFileInfo> {
        let url = self.url(&format!("/api/files/info/{id}"))?;
        self.send_json(self.http.get(url)).await
    }

    /// Consume one download, then import the key and decrypt locally.
    pub async fn download(&self, id: &str, password: Option<&str>) -> ClientResult<DownloadedFile> {
        let url = self.url(&format!("/api/files/download/{id}"))?;
        let mut req = self.http.post(url);
        if let Some(password) = password {
            req = req.json(&DownloadBody { password });
        }
        let payload: DownloadPayload = self.send_json(req).await?;

        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(&payload.encrypted_data)
            .map_err(|e| ClientError::Decode(format!("encrypted_data: {e}")))?;
        let nonce = base64::engine::general_purpose::STANDARD
            .decode(&payload.nonce)
            .map_err(|e| ClientError::Decode(format!("nonce: {e}")))?;
        let key = import_key(&payload.exported_key)?;

        let plaintext = Zeroizing::new(CipherEngine::decrypt(&ciphertext, &key, &nonce)?);

        Ok(DownloadedFile {
            original_name: payload.original_name,
            mime_type: payload.mime_type,
            download_count: payload.download_count,
            max_downloads: payload.max_downloads,
            plaintext,
        })
    }
}
