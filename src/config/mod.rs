use std::env;

/// Server configuration for share uploads, gating bounds and reclamation.
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Maximum ciphertext size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Upper bound for `max_downloads` on upload (default: 100)
    pub max_downloads_ceiling: i32,

    /// Upper bound for `expiry_hours` on upload (default: 168, one week)
    pub max_expiry_hours: i64,

    /// Seconds between scheduled sweeps (default: 3600)
    pub sweep_interval_secs: u64,

    /// Base URL used to build share/download links
    pub public_base_url: String,

    /// Ciphertext backend: "s3" or "fs" (default: "fs")
    pub storage_backend: String,

    /// Root directory for the "fs" backend (default: "./data/ciphertext")
    pub storage_path: String,

    /// JWT Secret Key for owner tokens
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100 MB
            max_downloads_ceiling: 100,
            max_expiry_hours: 24 * 7,
            sweep_interval_secs: 3600,
            public_base_url: "http://localhost:3000".to_string(),
            storage_backend: "fs".to_string(),
            storage_path: "./data/ciphertext".to_string(),
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl ShareConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_downloads_ceiling: env::var("MAX_DOWNLOADS_CEILING")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i32| *v >= 1)
                .unwrap_or(default.max_downloads_ceiling),

            max_expiry_hours: env::var("MAX_EXPIRY_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v >= 1)
                .unwrap_or(default.max_expiry_hours),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(default.sweep_interval_secs),

            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.public_base_url),

            storage_backend: env::var("STORAGE_BACKEND")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.storage_backend),

            storage_path: env::var("STORAGE_PATH").unwrap_or(default.storage_path),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret), // Fallback for dev convenience

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config for tests and local runs: short sweep interval, in-memory friendly
    pub fn development() -> Self {
        Self {
            sweep_interval_secs: 60,
            jwt_secret: "development_secret".to_string(),
            ..Self::default()
        }
    }

    pub fn share_url(&self, id: &str) -> String {
        format!("{}/share/{}", self.public_base_url, id)
    }

    pub fn download_url(&self, id: &str) -> String {
        format!("{}/download/{}", self.public_base_url, id)
    }
}
