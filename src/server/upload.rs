//! File-based database replacement.
//!
//! Uploaded files are staged through a temporary file in the uploads
//! directory, stored under a timestamped name, and become the server's
//! current database. SQL dumps are executed into a fresh database file
//! before the switch.

use std::io::Write;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tokio::task;
use tracing::info;

use crate::engine::SqliteEngine;
use crate::server::{AppError, AppState, ServerState};

/// Maximum accepted upload size (100 MB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: [&str; 4] = [".db", ".sqlite", ".sqlite3", ".sql"];

/// Response of a successful database upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always true; failures surface as error payloads.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Stored filename, timestamped to avoid collisions.
    pub filename: String,
}

pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    if state.read_only() {
        return Err(AppError::ReadOnly);
    }

    while let Some(field) = multipart.next_field().await? {
        let Some(original_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if !is_supported(&original_name) {
            return Err(AppError::UnsupportedUpload(original_name));
        }
        let bytes = field.bytes().await?;
        let state = state.clone();
        let response =
            task::spawn_blocking(move || store_upload(&state, &original_name, &bytes)).await??;
        return Ok(Json(response));
    }

    Err(AppError::MissingFile)
}

fn is_supported(name: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn store_upload(
    state: &ServerState,
    original_name: &str,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let uploads_dir = state.uploads_dir();
    std::fs::create_dir_all(uploads_dir)?;

    let stamp = time::OffsetDateTime::now_utc().unix_timestamp();
    let filename = format!("{stamp}-{original_name}");
    let destination = uploads_dir.join(&filename);

    // Stage through a temp file so a failed write never leaves a partial
    // database behind.
    let mut staged = tempfile::NamedTempFile::new_in(uploads_dir)?;
    staged.write_all(bytes)?;
    staged.persist(&destination).map_err(|err| err.error)?;

    let db_path = if original_name.ends_with(".sql") {
        let sql = std::str::from_utf8(bytes).map_err(|_| {
            AppError::UnsupportedUpload(format!("{original_name} is not valid UTF-8"))
        })?;
        let db_path = destination.with_extension("db");
        let engine = SqliteEngine::open(&db_path)?;
        engine.execute_batch(sql)?;
        db_path
    } else {
        destination
    };

    info!(database = %db_path.display(), "switching current database");
    state.set_db_path(db_path);

    Ok(UploadResponse {
        success: true,
        message: format!("database replaced with {original_name}"),
        filename,
    })
}
