//! Removal of namespaces that never completed.
//!
//! A failed or interrupted transcode leaves a namespace directory without a
//! completion marker. The reaper deletes such directories once they are
//! older than a grace period. Only directories whose names are well-formed
//! namespace ids are considered; anything else under the storage root is
//! left alone. Namespaces claimed in the [`InFlight`] registry are skipped
//! regardless of age.

use hlsforge_common::paths::marker_path;
use hlsforge_common::Namespace;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::in_flight::InFlight;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Namespace directories examined.
    pub scanned: usize,
    /// Namespaces skipped because the pipeline still holds them.
    pub in_flight: usize,
    /// Incomplete namespaces removed.
    pub removed: usize,
    /// Incomplete namespaces younger than the grace period.
    pub pending: usize,
}

/// Sweep `root` once, removing incomplete namespaces older than `grace`.
pub async fn sweep(
    root: &Path,
    grace: Duration,
    in_flight: &InFlight,
) -> std::io::Result<SweepReport> {
    let mut report = SweepReport::default();
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(namespace) = name.to_str().and_then(Namespace::parse) else {
            continue;
        };
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };
        report.scanned += 1;

        if in_flight.contains(&namespace) {
            report.in_flight += 1;
            continue;
        }

        let dir = entry.path();
        if tokio::fs::try_exists(marker_path(&dir)).await.unwrap_or(true) {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < grace {
            report.pending += 1;
            continue;
        }

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(%namespace, age_secs = age.as_secs(), "reaped incomplete namespace");
                report.removed += 1;
            }
            Err(e) => warn!(%namespace, error = %e, "failed to reap namespace"),
        }
    }

    Ok(report)
}

/// Run [`sweep`] every `interval` until `shutdown` is cancelled.
pub fn start_reaper_task(
    root: std::path::PathBuf,
    interval: Duration,
    grace: Duration,
    in_flight: InFlight,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
            }

            match sweep(&root, grace, &in_flight).await {
                Ok(report) if report.removed > 0 => {
                    info!(removed = report.removed, pending = report.pending, "reaper sweep");
                }
                Ok(_) => {}
                Err(e) => warn!(root = %root.display(), error = %e, "reaper sweep failed"),
            }
        }

        debug!("reaper stopped");
    })
}
