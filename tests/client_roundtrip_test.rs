mod common;

use common::setup_state;
use std::net::SocketAddr;
use zero_share::client::{ShareClient, UploadOptions};
use zero_share::create_app;
use zero_share::services::file_repository::FileRepository;
use zero_share::services::storage::CiphertextStore;
use zeroize::Zeroizing;

/// Serve the app on an ephemeral port and return its base URL.
async fn spawn_server() -> (String, zero_share::AppState) {
    let (state, _) = setup_state().await;
    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn test_encrypt_upload_download_decrypt() {
    let (base_url, state) = spawn_server().await;
    let client = ShareClient::new(&base_url).unwrap();
    let plaintext = b"the quarterly numbers, before anyone else sees them".to_vec();

    let share = client
        .upload(plaintext.clone(), "q3.txt", "text/plain", &UploadOptions::default())
        .await
        .unwrap();

    // The server only ever holds ciphertext.
    let grant_record = FileRepository::find(&state.db, &share.id).await.unwrap().unwrap();
    let stored = state.storage.get(&grant_record.ciphertext_ref).await.unwrap();
    assert_ne!(stored, plaintext);
    assert_eq!(stored.len(), plaintext.len() + 16);
    assert_eq!(grant_record.size_bytes, plaintext.len() as i64);

    let info = client.info(&share.id).await.unwrap();
    assert_eq!(info.original_name, "q3.txt");
    assert_eq!(info.max_downloads, 1);

    let file = client.download(&share.id, None).await.unwrap();
    assert_eq!(file.plaintext.as_slice(), plaintext.as_slice());
    assert_eq!(file.original_name, "q3.txt");
    assert_eq!(file.download_count, 1);

    let err = client.download(&share.id, None).await.err().unwrap();
    assert_eq!(err.code(), Some("LIMIT_REACHED"));
}

#[tokio::test]
async fn test_password_round_trip() {
    let (base_url, _) = spawn_server().await;
    let client = ShareClient::new(&base_url).unwrap();

    let options = UploadOptions {
        max_downloads: 2,
        expiry_hours: 1,
        password: Some(Zeroizing::new("tangerine".to_string())),
    };
    let share = client
        .upload(vec![42u8; 4096], "blob.bin", "application/octet-stream", &options)
        .await
        .unwrap();

    assert!(client.info(&share.id).await.unwrap().requires_password);

    let err = client.download(&share.id, None).await.err().unwrap();
    assert_eq!(err.code(), Some("PASSWORD_REQUIRED"));

    let err = client.download(&share.id, Some("clementine")).await.err().unwrap();
    assert_eq!(err.code(), Some("PASSWORD_INVALID"));

    let file = client.download(&share.id, Some("tangerine")).await.unwrap();
    assert_eq!(file.plaintext.as_slice(), vec![42u8; 4096].as_slice());
}

#[tokio::test]
async fn test_unknown_share() {
    let (base_url, _) = spawn_server().await;
    let client = ShareClient::new(&base_url).unwrap();

    let err = client.info("missing").await.err().unwrap();
    assert_eq!(err.code(), Some("NOT_FOUND"));
}
