use std::io::Write;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use magnetdex_core::{
    store::PendingHash, testing::fixtures, BacklogStore, QrCodeRenderer, ScanCodeWriter,
    SqliteStore,
};
use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Config with the scheduler off so the test never reaches a real mirror.
fn minimal_config(port: u16, dir: &TempDir) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"

[scheduler]
enabled = false

[indexer]
scan_codes = false
"#,
        port,
        dir.path().join("magnetdex.db").display()
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_magnetdex"))
        .env("MAGNETDEX_CONFIG", config_path)
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_and_status_endpoints() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, &data_dir));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let json: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    let json: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/status", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(json["scheduler"]["running"], false);
    assert_eq!(json["index"]["torrents"], 0);
    assert_eq!(json["config"]["server"]["port"], port);

    assert!(data_dir.path().join("magnetdex.db").exists());

    server.kill().await.ok();
}

/// Serve `body` for every path, as a mirror that has exactly one torrent.
async fn spawn_mirror(body: Vec<u8>) -> u16 {
    let app = Router::new().fallback(move || {
        let body = body.clone();
        async move { body }
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move { axum::serve(listener, app).await });
    port
}

#[tokio::test]
async fn test_ingestion_writes_scan_code_png() {
    let bytes = fixtures::single_file_torrent("demo.iso", 104_857_600);
    let hash = fixtures::info_hash_of(&bytes);
    let mirror_port = spawn_mirror(bytes).await;

    let data_dir = TempDir::new().unwrap();
    let db_path = data_dir.path().join("magnetdex.db");
    let scan_dir = data_dir.path().join("qrcode");
    {
        let store = SqliteStore::new(&db_path).unwrap();
        BacklogStore::insert(&store, &PendingHash::new(hash.clone())).unwrap();
    }

    let port = get_available_port();
    let config = write_config(&format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"

[scheduler]
enabled = true
workers = 1
idle_interval_ms = 50

[fetcher]
[[fetcher.mirrors]]
name = "local"
kind = "direct"
base_url = "http://127.0.0.1:{}"

[indexer]
scan_codes = true
scan_code_dir = "{}"
"#,
        port,
        db_path.display(),
        mirror_port,
        scan_dir.display()
    ));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let expected = ScanCodeWriter::new(&scan_dir, Arc::new(QrCodeRenderer)).path_for(&hash);
    let mut png = Vec::new();
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read(&expected) {
            if contents.len() > 24 {
                png = contents;
                break;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }
    server.kill().await.ok();

    assert!(!png.is_empty(), "no scan code at {}", expected.display());
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
    assert_eq!(width, height);
    assert_eq!(width % magnetdex_core::scan_code::MODULE_SIZE, 0);
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_magnetdex"))
            .env("MAGNETDEX_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[scheduler]
workers = 0
"#,
    );

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_magnetdex"))
            .env("MAGNETDEX_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
