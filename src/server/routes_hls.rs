//! `GET /hls/<namespace>/<file>`
//!
//! Unauthenticated static retrieval of manifests and segments. Range and
//! conditional requests are handled by `tower_http`'s `ServeFile`.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::publish::resolve;
use crate::server::{AppContext, AppError};

pub async fn serve_artifact(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let artifact = resolve(&ctx.config.storage.root, &path)?;

    let response = ServeFile::new(&artifact.path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.map(Body::new);

    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        let headers = response.headers_mut();
        let max_age = ctx.config.publish.manifest_max_age_secs;
        if let Some(value) = artifact
            .kind
            .cache_control(max_age)
            .and_then(|v| HeaderValue::from_str(&v).ok())
        {
            headers.insert(header::CACHE_CONTROL, value);
        }
        if status.is_success() {
            if let Some(content_type) = artifact.kind.content_type() {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
    }

    Ok(response)
}
