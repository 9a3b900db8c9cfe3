//! Upload intake.
//!
//! Validates the declared filename, allocates a fresh namespace directory and
//! streams the upload into `upload.<ext>` inside it, enforcing the byte
//! ceiling chunk by chunk so an oversized upload is never fully written.
//! The namespace stays claimed in the [`InFlight`] registry for as long as
//! the returned [`Upload`] lives.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use hlsforge_common::paths::{namespace_dir, upload_extension, upload_extensions, upload_path};
use hlsforge_common::{Error, Namespace, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::in_flight::{Claim, InFlight};

/// A persisted upload, ready for transcoding.
#[derive(Debug)]
pub struct Upload {
    pub namespace: Namespace,
    /// The namespace directory.
    pub dir: PathBuf,
    /// The transient upload artifact.
    pub input_path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
    /// Keeps the reaper away until the pipeline is done with the namespace.
    pub claim: Claim,
}

/// Map a declared filename to its accepted upload extension.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMediaType`] for any other extension.
pub fn check_extension(declared_filename: &str) -> Result<&'static str> {
    upload_extension(declared_filename).ok_or_else(|| {
        Error::unsupported_media_type(format!(
            "{declared_filename:?}: only {} allowed",
            upload_extensions().join("/")
        ))
    })
}

/// Persist an upload stream into a new namespace under `root`.
///
/// # Errors
///
/// - [`Error::UnsupportedMediaType`] if the extension is not accepted; no
///   directory is created in that case.
/// - [`Error::PayloadTooLarge`] as soon as the stream passes `size_limit`.
/// - whatever the stream yields as its own error (converted into [`Error`]).
/// - [`Error::Storage`] if the directory or file cannot be written.
///
/// On any failure after the namespace directory exists, the directory is
/// removed again.
pub async fn intake<S, E>(
    root: &Path,
    in_flight: &InFlight,
    stream: S,
    declared_filename: &str,
    size_limit: u64,
) -> Result<Upload>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
{
    let ext = check_extension(declared_filename)?;

    let namespace = Namespace::generate()?;
    let claim = in_flight.claim(&namespace);
    let dir = namespace_dir(root, &namespace);

    tokio::fs::create_dir_all(root)
        .await
        .map_err(|e| Error::storage(format!("create storage root {}: {e}", root.display())))?;
    tokio::fs::create_dir(&dir)
        .await
        .map_err(|e| Error::storage(format!("create namespace {namespace}: {e}")))?;

    let input_path = upload_path(&dir, ext);
    match persist(stream, &input_path, size_limit).await {
        Ok(bytes) => {
            info!(%namespace, bytes, "upload stored");
            Ok(Upload {
                namespace,
                dir,
                input_path,
                bytes,
                claim,
            })
        }
        Err(e) => {
            debug!(%namespace, error = %e, "intake failed, removing namespace");
            if let Err(rm) = tokio::fs::remove_dir_all(&dir).await {
                warn!(%namespace, error = %rm, "failed to remove partial namespace");
            }
            Err(e)
        }
    }
}

async fn persist<S, E>(stream: S, path: &Path, size_limit: u64) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
{
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::storage(format!("create {}: {e}", path.display())))?;

    let mut stream = std::pin::pin!(stream);
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::<Error>::into)?;

        written += chunk.len() as u64;
        if written > size_limit {
            return Err(Error::PayloadTooLarge { limit: size_limit });
        }

        file.write_all(&chunk)
            .await
            .map_err(|e| Error::storage(format!("write {}: {e}", path.display())))?;
    }

    file.flush()
        .await
        .map_err(|e| Error::storage(format!("flush {}: {e}", path.display())))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::tempdir;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes>> {
        let owned: Vec<Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::copy_from_slice(p))).collect();
        stream::iter(owned)
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn stores_upload_in_fresh_namespace() {
        let root = tempdir().unwrap();
        let in_flight = InFlight::new();
        let upload = intake(root.path(), &in_flight, chunks(&[b"abc", b"def"]), "Clip.MP4", 100)
            .await
            .unwrap();

        assert_eq!(upload.bytes, 6);
        assert_eq!(upload.dir, root.path().join(upload.namespace.as_str()));
        assert_eq!(upload.input_path.file_name().unwrap(), "upload.mp4");
        assert_eq!(std::fs::read(&upload.input_path).unwrap(), b"abcdef");
        assert_eq!(entries(&upload.dir), vec![upload.input_path.clone()]);
    }

    #[tokio::test]
    async fn exact_limit_is_accepted() {
        let root = tempdir().unwrap();
        let upload = intake(root.path(), &InFlight::new(), chunks(&[b"12345"]), "a.mkv", 5)
            .await
            .unwrap();
        assert_eq!(upload.bytes, 5);
    }

    #[tokio::test]
    async fn one_byte_over_limit_is_rejected_and_cleaned_up() {
        let root = tempdir().unwrap();
        let in_flight = InFlight::new();
        let err = intake(root.path(), &in_flight, chunks(&[b"123", b"456"]), "a.mov", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge { limit: 5 }));
        assert!(entries(root.path()).is_empty());
    }

    #[tokio::test]
    async fn disallowed_extension_creates_nothing() {
        let root = tempdir().unwrap();
        let in_flight = InFlight::new();
        let err = intake(root.path(), &in_flight, chunks(&[b"hello"]), "notes.txt", 100)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedMediaType(_)));
        assert!(entries(root.path()).is_empty());
    }

    #[tokio::test]
    async fn stream_error_is_propagated_and_cleaned_up() {
        let root = tempdir().unwrap();
        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(Error::validation("truncated form")),
        ]);
        let err = intake(root.path(), &InFlight::new(), broken, "a.webm", 100)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(entries(root.path()).is_empty());
    }

    #[tokio::test]
    async fn local_read_error_is_storage() {
        let root = tempdir().unwrap();
        let broken = stream::iter(vec![Err::<Bytes, _>(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated",
        ))]);
        let err = intake(root.path(), &InFlight::new(), broken, "a.webm", 100)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(entries(root.path()).is_empty());
    }

    #[tokio::test]
    async fn namespace_is_claimed_while_upload_lives() {
        let root = tempdir().unwrap();
        let in_flight = InFlight::new();
        let upload = intake(root.path(), &in_flight, chunks(&[b"x"]), "a.mp4", 10)
            .await
            .unwrap();

        assert!(in_flight.contains(&upload.namespace));
        let namespace = upload.namespace.clone();
        drop(upload);
        assert!(!in_flight.contains(&namespace));
    }

    #[tokio::test]
    async fn failed_intake_releases_claim() {
        let root = tempdir().unwrap();
        let in_flight = InFlight::new();
        intake(root.path(), &in_flight, chunks(&[b"123456"]), "a.mp4", 5)
            .await
            .unwrap_err();
        assert!(in_flight.is_empty());
    }

    #[test]
    fn test_check_extension_message_lists_allowed() {
        let err = check_extension("notes.txt").unwrap_err();
        assert!(err.to_string().contains("only mp4/mov/mkv/webm allowed"));
        assert_eq!(check_extension("a.MKV").unwrap(), "mkv");
    }

    #[tokio::test]
    async fn missing_root_is_created() {
        let base = tempdir().unwrap();
        let root = base.path().join("nested/storage");
        let upload = intake(&root, &InFlight::new(), chunks(&[b"x"]), "a.mp4", 10)
            .await
            .unwrap();
        assert!(upload.input_path.starts_with(&root));
    }
}
