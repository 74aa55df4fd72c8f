// SKYLINE Web Server
// Copyright (c) 2026 Xing_The_Creator | SKYLINE

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::export;
use crate::imaging::{self, ExportFormat};
use crate::params::StyleParameters;
use crate::state::SharedState;
use crate::store::ArtworkRecord;
use crate::variation;

/// Entries returned by `/history`.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub image_paths: Vec<String>,
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "png".to_string()
}

pub fn create_router(state: SharedState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/generate", post(generate_art))
        .route("/history", get(get_history))
        .route("/export-batch", post(export_batch))
        .nest_service("/static", ServeDir::new(&static_dir))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn start_server(state: SharedState) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("[SERVER] 🌆 SKYLINE running on http://127.0.0.1:{}", port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn generate_art(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = HashMap::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::bad_request(format!("Malformed form data: {}", e))),
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed form field '{}': {}", name, e)))?;
        form.insert(name, value);
    }

    let canvas_data = match form.remove("canvas_data") {
        Some(data) if !data.is_empty() => data,
        _ => return Err(ApiError::bad_request("No canvas data provided")),
    };

    let base = StyleParameters::from_form(&form).map_err(|e| ApiError::bad_request(e.to_string()))?;
    // Bad data URL is a 400; image bytes that fail to decode stay a 500
    let bytes = imaging::decode_data_url(&canvas_data)
        .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;
    let derived = variation::randomize(&base, &mut rand::thread_rng());

    let output_dir = state.config.output_dir.clone();
    let store = state.store.clone();
    let params = derived.clone();
    let (path, record) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let path = imaging::save_canvas(&bytes, &output_dir)?;
        let image_path = path.to_string_lossy().replace('\\', "/");

        // A failed record is logged; the image itself is already on disk.
        let record = match store.save(&image_path, &params) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("[STORE] Error saving artwork: {:#}", e);
                None
            }
        };
        Ok((path, record))
    })
    .await
    .context("Image task failed")??;

    let id = record
        .map(|r| r.id)
        .unwrap_or_else(|| rand::Rng::gen_range(&mut rand::thread_rng(), 1000..=9999));

    Ok(Json(json!({
        "status": "success",
        "images": [{
            "image": state.config.public_url(&path)?,
            "id": id,
            "parameters": derived,
        }]
    })))
}

async fn get_history(State(state): State<SharedState>) -> Json<Vec<ArtworkRecord>> {
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.list_recent(HISTORY_LIMIT)).await;

    match result {
        Ok(Ok(records)) => Json(records),
        Ok(Err(e)) => {
            error!("[SERVER] Error fetching history: {:#}", e);
            Json(Vec::new())
        }
        Err(e) => {
            error!("[SERVER] History task failed: {}", e);
            Json(Vec::new())
        }
    }
}

async fn export_batch(
    State(state): State<SharedState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!("[EXPORT] Rejected payload: {}", e);
        ApiError::bad_request("No JSON data provided")
    })?;

    if request.image_paths.is_empty() {
        return Err(ApiError::bad_request("No images selected"));
    }
    let format = ExportFormat::parse(&request.format).ok_or_else(|| {
        ApiError::bad_request(format!("Unsupported export format '{}'", request.format))
    })?;

    let config = state.config.clone();
    let archive = tokio::task::spawn_blocking(move || {
        export::export_batch(&request.image_paths, format, &config)
    })
    .await
    .context("Export task failed")??;

    Ok(Json(json!({
        "status": "success",
        "download_url": state.config.public_url(&archive.path)?,
    })))
}
