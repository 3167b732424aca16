use crate::server::{error_response, AppContext};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use brakewatch_common::paths::{find_files_by_extension, ExtensionMatcher};
use brakewatch_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub fn queue_routes() -> Router<AppContext> {
    Router::new().route("/queue", get(list_queue).post(enqueue))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct QueueItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnqueueRequest {
    /// Path relative to the source library, as listed by `/api/files/source`
    pub path: String,
}

async fn list_queue(
    State(ctx): State<AppContext>,
) -> std::result::Result<Json<Vec<QueueItem>>, (StatusCode, String)> {
    let dir = ctx.config.watch.input_dir.clone();
    let matcher = ctx.matcher.clone();

    tokio::task::spawn_blocking(move || queued_items(&dir, &matcher))
        .await
        .map(Json)
        .map_err(|e| error_response(Error::internal(format!("queue scan failed: {e}"))))
}

/// Media files waiting in the watch directory, by name.
pub fn queued_items(dir: &Path, matcher: &ExtensionMatcher) -> Vec<QueueItem> {
    find_files_by_extension(dir, matcher)
        .into_iter()
        .filter_map(|path| {
            path.file_name().map(|n| QueueItem {
                name: n.to_string_lossy().to_string(),
            })
        })
        .collect()
}

async fn enqueue(
    State(ctx): State<AppContext>,
    Json(req): Json<EnqueueRequest>,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let watch = &ctx.config.watch;
    let source = resolve_source(&watch.source_dir, &req.path).map_err(error_response)?;

    if !ctx.matcher.matches_path(&source) {
        return Err(error_response(Error::invalid_input(format!(
            "Not a media file: {}",
            req.path
        ))));
    }

    let metadata = tokio::fs::metadata(&source)
        .await
        .map_err(|_| error_response(Error::not_found(req.path.clone())))?;
    if !metadata.is_file() {
        return Err(error_response(Error::invalid_input(format!(
            "Path is not a file: {}",
            req.path
        ))));
    }

    // `resolve_source` guarantees a file name.
    let name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let link = watch.input_dir.join(&name);

    if tokio::fs::symlink_metadata(&link).await.is_ok() {
        return Err((
            StatusCode::CONFLICT,
            format!("Already queued: {}", name.to_string_lossy()),
        ));
    }

    link_into_queue(&source, &link)
        .await
        .map_err(|e| error_response(Error::from(e)))?;

    tracing::info!("Queued {} via {}", source.display(), link.display());

    Ok((
        StatusCode::CREATED,
        Json(QueueItem {
            name: name.to_string_lossy().to_string(),
        }),
    ))
}

/// Join a library-relative path onto `source_dir`, refusing anything that could
/// leave it.
pub fn resolve_source(source_dir: &Path, requested: &str) -> Result<PathBuf> {
    let relative = Path::new(requested.trim_start_matches('/'));

    if relative.file_name().is_none() {
        return Err(Error::invalid_input(format!("Not a file path: {requested}")));
    }
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(Error::invalid_input(format!(
            "Path escapes the source directory: {requested}"
        )));
    }

    Ok(source_dir.join(relative))
}

#[cfg(unix)]
async fn link_into_queue(source: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(source, link).await
}

#[cfg(not(unix))]
async fn link_into_queue(source: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::copy(source, link).await.map(|_| ())
}
