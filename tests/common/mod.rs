//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a full [`AppContext`] over a
//! temporary storage root and a [`FakeEngine`] standing in for ffmpeg, plus
//! helpers for building authenticated multipart upload requests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hlsforge::config::Config;
use hlsforge::pipeline::Pipeline;
use hlsforge::server::{create_router, AppContext};
use hlsforge_av::{Engine, EngineExit, EngineProcess, HlsInvocation};
use http_body_util::BodyExt;
use tempfile::TempDir;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "correct horse";

const BOUNDARY: &str = "hlsforge-test-boundary";

/// How the fake engine behaves once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Writes two segments and a VOD manifest, then exits 0.
    Succeed,
    /// Exits 1 without writing anything.
    Fail,
    /// Never exits on its own.
    Hang,
}

pub struct FakeEngine {
    behavior: FakeBehavior,
}

impl FakeEngine {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self { behavior }
    }
}

struct FakeProcess {
    behavior: FakeBehavior,
    invocation: HlsInvocation,
}

#[async_trait]
impl Engine for FakeEngine {
    fn name(&self) -> &str {
        "fake-ffmpeg"
    }

    async fn start(
        &self,
        invocation: &HlsInvocation,
    ) -> hlsforge_av::Result<Box<dyn EngineProcess>> {
        if !invocation.input().exists() {
            return Err(hlsforge_av::Error::file_not_found(invocation.input()));
        }
        Ok(Box::new(FakeProcess {
            behavior: self.behavior,
            invocation: invocation.clone(),
        }))
    }
}

#[async_trait]
impl EngineProcess for FakeProcess {
    async fn wait(&mut self) -> hlsforge_av::Result<EngineExit> {
        match self.behavior {
            FakeBehavior::Succeed => {
                let mut manifest = String::from(
                    "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-PLAYLIST-TYPE:VOD\n",
                );
                for index in 0..2 {
                    let segment = self.invocation.segment_path(index);
                    tokio::fs::write(&segment, vec![0x47u8; 188 * 4]).await?;
                    let name = segment
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_string();
                    manifest.push_str(&format!("#EXTINF:4.000000,\n{name}\n"));
                }
                manifest.push_str("#EXT-X-ENDLIST\n");
                tokio::fs::write(self.invocation.manifest_path(), manifest).await?;
                Ok(EngineExit::success())
            }
            FakeBehavior::Fail => Ok(EngineExit::with_code(1)),
            FakeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> hlsforge_av::Result<()> {
        Ok(())
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary storage root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub storage: TempDir,
}

impl TestHarness {
    /// Harness with default settings and an engine that succeeds.
    pub fn new() -> Self {
        Self::with_behavior(FakeBehavior::Succeed)
    }

    pub fn with_behavior(behavior: FakeBehavior) -> Self {
        Self::with_config(test_config(), behavior)
    }

    /// Harness with a custom configuration. The storage root is always
    /// replaced by a fresh temporary directory.
    pub fn with_config(mut config: Config, behavior: FakeBehavior) -> Self {
        let storage = tempfile::tempdir().expect("failed to create storage dir");
        config.storage.root = storage.path().to_path_buf();

        let config = Arc::new(config);
        let engine: Arc<dyn Engine> = Arc::new(FakeEngine::new(behavior));
        let pipeline = Arc::new(Pipeline::from_config(&config, engine));
        let ctx = AppContext::new(config, pipeline);

        Self { ctx, storage }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub fn root(&self) -> &Path {
        self.storage.path()
    }

    /// Directories currently under the storage root.
    pub fn namespace_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(self.root())
            .expect("failed to read storage root")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

/// Default configuration for tests: known credentials, short timeouts.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.auth.username = USERNAME.to_string();
    config.server.auth.password_hash =
        Some(bcrypt::hash(PASSWORD, 4).expect("failed to hash password"));
    config.transcode.timeout_secs = 5;
    config.transcode.kill_grace_secs = 1;
    config.transcode.max_concurrent_jobs = 2;
    config
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Encode a single-file multipart body.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Encode a multipart body whose file part follows a plain form field of
/// `field_len` bytes.
pub fn multipart_body_after_field(field_len: usize, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\n");
    body.extend(std::iter::repeat(b'x').take(field_len));
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(&multipart_body("file", filename, content));
    body
}

/// Authenticated `POST /upload` carrying a raw multipart `body`.
pub fn raw_upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, basic_auth(USERNAME, PASSWORD))
        .body(Body::from(body))
        .expect("failed to build upload request")
}

/// Build an authenticated `POST /upload` request.
pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    upload_request_with(Some(basic_auth(USERNAME, PASSWORD)), "file", filename, content)
}

pub fn upload_request_with(
    authorization: Option<String>,
    field: &str,
    filename: &str,
    content: &[u8],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder
        .body(Body::from(multipart_body(field, filename, content)))
        .expect("failed to build upload request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
