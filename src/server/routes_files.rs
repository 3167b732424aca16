use crate::library::{scan_source_tree, Directory};
use crate::server::{error_response, AppContext};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use brakewatch_common::Error;

pub fn files_routes() -> Router<AppContext> {
    Router::new().route("/files/source", get(source_tree))
}

async fn source_tree(
    State(ctx): State<AppContext>,
) -> Result<Json<Directory>, (StatusCode, String)> {
    let root = ctx.config.watch.source_dir.clone();
    let matcher = ctx.matcher.clone();

    tokio::task::spawn_blocking(move || scan_source_tree(&root, &matcher))
        .await
        .map(Json)
        .map_err(|e| error_response(Error::internal(format!("library scan failed: {e}"))))
}
