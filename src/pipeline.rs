//! The upload pipeline: intake, transcode, publish.
//!
//! Each call runs synchronously end to end. The namespace is only handed back
//! to the caller when the transcode completed, so a failed upload is never
//! advertised.

use bytes::Bytes;
use futures::Stream;
use hlsforge_av::Engine;
use hlsforge_common::paths::MANIFEST_NAME;
use hlsforge_common::{Error, Namespace, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::in_flight::InFlight;
use crate::intake::intake;
use crate::transcode::{TranscodeJob, Transcoder};

/// URL prefix under which namespaces are served.
pub const HLS_MOUNT: &str = "/hls";

/// A namespace that finished transcoding and can be played.
#[derive(Debug, Clone, Serialize)]
pub struct Published {
    pub id: Namespace,
    pub hls_url: String,
    #[serde(skip)]
    pub manifest_path: PathBuf,
}

/// Public URL of the manifest of `namespace`.
pub fn manifest_url(namespace: &Namespace) -> String {
    format!("{HLS_MOUNT}/{namespace}/{MANIFEST_NAME}")
}

pub struct Pipeline {
    storage_root: PathBuf,
    max_upload_bytes: u64,
    deadline: Duration,
    transcoder: Arc<Transcoder>,
    in_flight: InFlight,
}

impl Pipeline {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        max_upload_bytes: u64,
        deadline: Duration,
        transcoder: Arc<Transcoder>,
    ) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_upload_bytes,
            deadline,
            transcoder,
            in_flight: InFlight::new(),
        }
    }

    pub fn from_config(config: &Config, engine: Arc<dyn Engine>) -> Self {
        let transcoder = Arc::new(Transcoder::from_config(engine, &config.transcode));
        Self::new(
            config.storage.root.clone(),
            config.storage.max_upload_bytes,
            config.transcode.timeout(),
            transcoder,
        )
    }

    /// Namespaces currently being uploaded or transcoded.
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Number of engine slots free right now.
    pub fn idle_engine_slots(&self) -> usize {
        self.transcoder.available_permits()
    }

    /// Persist `stream` as `filename`, transcode it, and return where the
    /// result is served.
    pub async fn process<S, E>(
        &self,
        stream: S,
        filename: &str,
        cancel: CancellationToken,
    ) -> Result<Published>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<Error>,
    {
        let upload = intake(
            &self.storage_root,
            &self.in_flight,
            stream,
            filename,
            self.max_upload_bytes,
        )
        .await?;

        let job = TranscodeJob::new(
            upload.namespace.clone(),
            &upload.input_path,
            &upload.dir,
            self.deadline,
        )
        .with_cancel(cancel);
        let report = self.transcoder.run(job).await?;

        Ok(Published {
            hls_url: manifest_url(&upload.namespace),
            id: upload.namespace,
            manifest_path: report.manifest_path,
        })
    }
}
