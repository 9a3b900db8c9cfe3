//! `POST /upload`

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use hlsforge_common::Error;

use crate::server::{AppContext, AppError};

/// Name of the multipart field carrying the media file.
pub const FILE_FIELD: &str = "file";

/// Accept a multipart upload, transcode it, and answer with where it plays.
///
/// Fields other than [`FILE_FIELD`] are skipped. The request does not return
/// until the transcode finished one way or another.
pub async fn upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limit = ctx.config.storage.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::validation("file field has no filename"))?;

        let body = field.map_err(move |e| read_error(e, limit));
        let published = ctx
            .pipeline
            .process(body, &filename, ctx.shutdown.child_token())
            .await?;

        tracing::info!(namespace = %published.id, filename = %filename, "upload published");
        return Ok((StatusCode::CREATED, Json(published)));
    }

    Err(Error::validation(format!("file field '{FILE_FIELD}' required")).into())
}

/// Hitting the request body limit is a size error even when it happens
/// inside a form field rather than the file.
fn read_error(err: MultipartError, limit: u64) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::validation(format!("failed to read upload: {}", err.body_text()))
    }
}
