//! Command-line sender and recipient for Zero Share.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zero_share::client::{ShareClient, UploadOptions};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "zero-share-cli")]
#[command(about = "Encrypt, share and fetch files through a Zero Share server")]
#[command(version)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "ZERO_SHARE_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Owner token to attribute uploads to
    #[arg(long, env = "ZERO_SHARE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file locally and upload the ciphertext
    Upload {
        path: PathBuf,

        #[arg(long, default_value_t = 1)]
        max_downloads: i32,

        #[arg(long, default_value_t = 24)]
        expiry_hours: i64,

        /// Require this password on download
        #[arg(long)]
        password: Option<String>,

        #[arg(long, default_value = "application/octet-stream")]
        mime_type: String,
    },
    /// Show public metadata of a share
    Info { id: String },
    /// Download and decrypt a share
    Download {
        id: String,

        #[arg(long)]
        password: Option<String>,

        /// Output path (default: the original file name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zero_share_cli=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut client = ShareClient::new(&cli.server).context("invalid server URL")?;
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Upload {
            path,
            max_downloads,
            expiry_hours,
            password,
            mime_type,
        } => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("path has no usable file name")?
                .to_string();
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let options = UploadOptions {
                max_downloads,
                expiry_hours,
                password: password.map(Zeroizing::new),
            };
            let share = client.upload(data, &name, &mime_type, &options).await?;

            println!("id:           {}", share.id);
            println!("share url:    {}", share.share_url);
            println!("download url: {}", share.download_url);
            println!("expires at:   {}", share.expires_at);
        }
        Commands::Info { id } => {
            let info = client.info(&id).await?;
            println!("name:       {}", info.original_name);
            println!("size:       {} bytes", info.size_bytes);
            println!("type:       {}", info.mime_type);
            println!("downloads:  {}/{}", info.download_count, info.max_downloads);
            println!("expires at: {}", info.expires_at);
            println!("password:   {}", if info.requires_password { "required" } else { "none" });
        }
        Commands::Download { id, password, out } => {
            let password = password.map(Zeroizing::new);
            let file = client.download(&id, password.as_deref().map(String::as_str)).await?;

            // Keep only the final component of a server-supplied name.
            let out = match out {
                Some(out) => out,
                None => PathBuf::from(
                    std::path::Path::new(&file.original_name)
                        .file_name()
                        .context("server sent an unusable file name; pass --out")?,
                ),
            };
            tokio::fs::write(&out, file.plaintext.as_slice())
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;

            println!(
                "saved {} ({} of {} downloads used)",
                out.display(),
                file.download_count,
                file.max_downloads
            );
        }
    }

    Ok(())
}
