//! Test helpers: build the gateway app against isolated storage.
//!
//! Run from workspace root: `cargo test -p mirrorgate-api`.

use axum_test::TestServer;
use mirrorgate_api::setup;
use mirrorgate_core::GatewayConfig;
use tempfile::TempDir;

/// Test application: server and owned temp directories.
pub struct TestApp {
    pub server: TestServer,
    pub storage_dir: TempDir,
    pub state_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(storage_dir: &TempDir, state_dir: &TempDir) -> GatewayConfig {
    GatewayConfig {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        storage_path: storage_dir.path().to_string_lossy().into_owned(),
        storage_base_url: "http://localhost:3000/uploads".to_string(),
        state_dir: state_dir.path().to_string_lossy().into_owned(),
        max_file_size_bytes: 1024 * 1024,
        allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
        allowed_content_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
    }
}

/// Setup a test app with isolated storage and state directories.
pub async fn setup_test_app() -> TestApp {
    let storage_dir = TempDir::new().unwrap();
    let state_dir = TempDir::new().unwrap();
    let config = test_config(&storage_dir, &state_dir);

    let (_state, router) = setup::initialize_app(config).await.unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        storage_dir,
        state_dir,
    }
}

/// Rebuild the app over the same directories, as a restart would.
pub async fn restart_test_app(app: TestApp) -> TestApp {
    let TestApp {
        storage_dir,
        state_dir,
        ..
    } = app;
    let config = test_config(&storage_dir, &state_dir);

    let (_state, router) = setup::initialize_app(config).await.unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        storage_dir,
        state_dir,
    }
}

/// Minimal valid PNG file bytes (8-byte signature + IHDR fragment); the
/// gateway validates name and type, not pixel data.
pub fn minimal_png() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&[0u8; 17]);
    bytes
}
