//! HTTP server: a thin axum translation of the service facade.
//!
//! Routing and request parsing live here; every operation, status gate,
//! and error classification belongs to `aperture_core::ImageService`.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use aperture_core::store::RecordStore;
use aperture_core::{
    caption, Config, FileStore, ImageResponse, ImageService, ServiceError, SqliteStore,
    StatsSummary, UploadReceipt,
};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
}

/// Wire the service from configuration and run the server until shutdown.
pub async fn execute(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let files = Arc::new(FileStore::from_config(&config)?);
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open(&config.db_path())?);
    let captioner = caption::from_config(
        &config.caption,
        Duration::from_millis(config.limits.caption_timeout_ms),
    );
    if captioner.name() != "disabled" {
        if captioner.is_available().await {
            tracing::info!(backend = captioner.name(), "caption backend reachable");
        } else {
            tracing::warn!(
                backend = captioner.name(),
                "caption backend not reachable; captions will be empty"
            );
        }
    }
    let service = Arc::new(ImageService::new(&config, store, files, captioner));

    let app = router(service, &config);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the API router.
pub fn router(service: Arc<ImageService>, config: &Config) -> Router {
    let max_body = (config.limits.max_file_size_mb as usize) * 1024 * 1024
        // headroom for multipart framing
        + 64 * 1024;
    Router::new()
        .route("/api/images", post(upload_image).get(list_images))
        .route("/api/images/{id}", get(get_image))
        .route("/api/images/{id}/thumbnails/{preset}", get(get_thumbnail))
        .route("/api/stats", get(get_stats))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(service)
}

/// Translates service errors into HTTP responses.
struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ServiceError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServiceError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            other => {
                tracing::error!(error = %other, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

async fn upload_image(
    State(service): State<Arc<ImageService>>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError(ServiceError::BadRequest(format!(
            "malformed multipart body: {e}"
        )))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ApiError(ServiceError::BadRequest(format!(
                "failed to read upload: {e}"
            )))
        })?;
        let receipt = service.upload(&original_name, bytes.to_vec()).await?;
        return Ok(Json(receipt));
    }
    Err(ApiError(ServiceError::BadRequest(
        "missing 'file' field".to_string(),
    )))
}

async fn list_images(
    State(service): State<Arc<ImageService>>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    Ok(Json(service.list().await?))
}

async fn get_image(
    State(service): State<Arc<ImageService>>,
    Path(id): Path<String>,
) -> Result<Json<ImageResponse>, ApiError> {
    Ok(Json(service.get(&id).await?))
}

async fn get_thumbnail(
    State(service): State<Arc<ImageService>>,
    Path((id, preset)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = service.thumbnail(&id, &preset).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

async fn get_stats(
    State(service): State<Arc<ImageService>>,
) -> Result<Json<StatsSummary>, ApiError> {
    Ok(Json(service.stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_core::{DisabledCaptioner, MemoryStore};
    use image::{DynamicImage, ImageFormat};
    use reqwest::multipart::{Form, Part};
    use std::io::Cursor;

    async fn spawn_app() -> (String, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        let files = Arc::new(FileStore::from_config(&config).unwrap());
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let service = Arc::new(ImageService::new(
            &config,
            store,
            files,
            Arc::new(DisabledCaptioner),
        ));
        let app = router(service, &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), dir)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    async fn upload(
        client: &reqwest::Client,
        base: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> serde_json::Value {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(name.to_string()));
        client
            .post(format!("{base}/api/images"))
            .multipart(form)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn wait_terminal(
        client: &reqwest::Client,
        base: &str,
        id: &str,
    ) -> serde_json::Value {
        for _ in 0..400 {
            let body: serde_json::Value = client
                .get(format!("{base}/api/images/{id}"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if body["status"] != "processing" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("item {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn upload_poll_fetch_thumbnails() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let receipt = upload(&client, &base, "photo.png", png_bytes(320, 240)).await;
        assert_eq!(receipt["status"], "processing");
        let id = receipt["image_id"].as_str().unwrap().to_string();

        let body = wait_terminal(&client, &base, &id).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["metadata"]["width"], 320);
        assert_eq!(body["data"]["metadata"]["height"], 240);
        assert!(body["data"]["processed_at"].is_string());

        for preset in ["small", "medium"] {
            let resp = client
                .get(format!("{base}/api/images/{id}/thumbnails/{preset}"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::OK);
            assert_eq!(
                resp.headers()[reqwest::header::CONTENT_TYPE],
                "image/jpeg"
            );
            assert!(!resp.bytes().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn invalid_upload_is_failed_data_not_transport_error() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/images"))
            .multipart(Form::new().part(
                "file",
                Part::bytes(b"not an image".to_vec()).file_name("fake.jpg"),
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let receipt: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(receipt["status"], "failed");
        assert_eq!(receipt["error"], "invalid file format");
    }

    #[tokio::test]
    async fn thumbnail_error_statuses() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let receipt = upload(&client, &base, "photo.png", png_bytes(64, 64)).await;
        let id = receipt["image_id"].as_str().unwrap().to_string();
        wait_terminal(&client, &base, &id).await;

        // Unknown preset
        let resp = client
            .get(format!("{base}/api/images/{id}/thumbnails/huge"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        // Unknown id
        let resp = client
            .get(format!("{base}/api/images/no-such-id/thumbnails/small"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        // Failed item: thumbnails gated with 400
        let bad = upload(&client, &base, "fake.png", b"junk".to_vec()).await;
        let bad_id = bad["image_id"].as_str().unwrap();
        let resp = client
            .get(format!("{base}/api/images/{bad_id}/thumbnails/small"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_record_is_404() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();
        let resp = client
            .get(format!("{base}/api/images/no-such-id"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_on_empty_store() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();
        let stats: serde_json::Value = client
            .get(format!("{base}/api/stats"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["total"], 0);
        assert_eq!(stats["failed"], 0);
        assert_eq!(stats["success_rate"], "0%");
        assert_eq!(stats["average_processing_time_seconds"], 0.0);
    }

    #[tokio::test]
    async fn listing_returns_newest_first() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let first = upload(&client, &base, "a.png", png_bytes(16, 16)).await;
        let second = upload(&client, &base, "b.txt", b"x".to_vec()).await;

        let listed: serde_json::Value = client
            .get(format!("{base}/api/images"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let items = listed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["data"]["image_id"], second["image_id"]);
        assert_eq!(items[1]["data"]["image_id"], first["image_id"]);
    }
}
