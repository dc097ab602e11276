//! End-to-end tests for the upload → pipeline → read path, driving the
//! service facade against the in-memory record store.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use aperture_core::caption::{CaptionInput, Captioner};
use aperture_core::store::RecordStore;
use aperture_core::{
    Config, DisabledCaptioner, FileStore, ImageResponse, ImageService, ImageStatus, MemoryStore,
    PipelineError, ServiceError, ThumbnailPreset,
};

struct Harness {
    _dir: tempfile::TempDir,
    files: Arc<FileStore>,
    store: Arc<MemoryStore>,
    service: ImageService,
}

fn harness_with(captioner: Arc<dyn Captioner>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    let files = Arc::new(FileStore::from_config(&config).unwrap());
    let store = Arc::new(MemoryStore::new());
    let service = ImageService::new(&config, store.clone(), files.clone(), captioner);
    Harness {
        _dir: dir,
        files,
        store,
        service,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(DisabledCaptioner))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

async fn wait_terminal(service: &ImageService, id: &str) -> ImageResponse {
    for _ in 0..400 {
        let response = service.get(id).await.unwrap();
        if response.status != ImageStatus::Processing {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("item {id} never reached a terminal state");
}

#[tokio::test]
async fn upload_reaches_success_with_true_dimensions() {
    let h = harness();
    let receipt = h
        .service
        .upload("landscape.png", png_bytes(640, 480))
        .await
        .unwrap();
    assert_eq!(receipt.status, ImageStatus::Processing);

    let response = wait_terminal(&h.service, &receipt.image_id).await;
    assert_eq!(response.status, ImageStatus::Success);
    assert_eq!(response.data.metadata.width, Some(640));
    assert_eq!(response.data.metadata.height, Some(480));
    assert_eq!(response.data.metadata.format.as_deref(), Some("png"));
    assert!(response.data.processed_at.is_some());
    assert_eq!(response.data.thumbnails.len(), 2);
}

#[tokio::test]
async fn thumbnails_fit_bounds_and_preserve_aspect() {
    let h = harness();
    let receipt = h
        .service
        .upload("wide.jpg", jpeg_bytes(1200, 300))
        .await
        .unwrap();
    wait_terminal(&h.service, &receipt.image_id).await;

    for preset in ThumbnailPreset::ALL {
        let bytes = h
            .service
            .thumbnail(&receipt.image_id, preset.name())
            .await
            .unwrap();
        assert!(!bytes.is_empty());
        let thumb = image::load_from_memory(&bytes).unwrap();
        let (max_w, max_h) = preset.bounds();
        assert!(thumb.width() <= max_w && thumb.height() <= max_h);
        let aspect = thumb.width() as f64 / thumb.height() as f64;
        assert!((aspect - 4.0).abs() < 0.1, "aspect drifted: {aspect}");
    }
}

#[tokio::test]
async fn renamed_non_image_fails_without_pipeline_run() {
    let h = harness();
    let gif = {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(32, 32)
            .write_to(&mut buf, ImageFormat::Gif)
            .unwrap();
        buf.into_inner()
    };
    let receipt = h.service.upload("sneaky.png", gif).await.unwrap();
    assert_eq!(receipt.status, ImageStatus::Failed);
    assert_eq!(receipt.error.as_deref(), Some("invalid file format"));

    // Already terminal at return time; no pipeline artifacts exist
    let response = h.service.get(&receipt.image_id).await.unwrap();
    assert_eq!(response.status, ImageStatus::Failed);
    assert!(response.data.processed_at.is_some());
    for preset in ThumbnailPreset::ALL {
        assert!(!h.files.thumbnail_path(&receipt.image_id, preset).exists());
    }
}

#[tokio::test]
async fn disallowed_extension_fails_regardless_of_content() {
    let h = harness();
    // Perfectly valid PNG bytes under a disallowed extension
    let receipt = h
        .service
        .upload("photo.webp", png_bytes(32, 32))
        .await
        .unwrap();
    assert_eq!(receipt.status, ImageStatus::Failed);
}

#[tokio::test]
async fn processed_at_iff_terminal() {
    let h = harness();
    let good = h.service.upload("a.png", png_bytes(16, 16)).await.unwrap();
    let bad = h.service.upload("b.txt", b"nope".to_vec()).await.unwrap();
    wait_terminal(&h.service, &good.image_id).await;

    for record in h.store.list_all().await.unwrap() {
        assert_eq!(
            record.processed_at.is_some(),
            record.status.is_terminal(),
            "record {} violates processed_at iff terminal",
            record.id
        );
    }
    assert_ne!(good.image_id, bad.image_id);
}

#[tokio::test]
async fn concurrent_uploads_are_independent() {
    let h = harness();

    let mut receipts = Vec::new();
    for i in 0..8u32 {
        let name = format!("img-{i}.png");
        let bytes = if i == 3 {
            // One corrupt upload in the middle must not affect the others
            b"corrupt".to_vec()
        } else {
            png_bytes(64 + i, 32 + i)
        };
        receipts.push(h.service.upload(&name, bytes).await.unwrap());
    }

    let mut ids: Vec<String> = receipts.iter().map(|r| r.image_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), receipts.len(), "ids must never collide");

    for (i, receipt) in receipts.iter().enumerate() {
        let response = wait_terminal(&h.service, &receipt.image_id).await;
        if i == 3 {
            assert_eq!(response.status, ImageStatus::Failed);
        } else {
            assert_eq!(response.status, ImageStatus::Success);
            assert_eq!(response.data.metadata.width, Some(64 + i as u32));
        }
    }
}

#[tokio::test]
async fn caption_failure_still_succeeds() {
    struct ExplodingCaptioner;

    #[async_trait]
    impl Captioner for ExplodingCaptioner {
        fn name(&self) -> &str {
            "exploding"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _input: &CaptionInput) -> Result<String, PipelineError> {
            Err(PipelineError::Caption {
                message: "inference backend unavailable".to_string(),
            })
        }
    }

    let h = harness_with(Arc::new(ExplodingCaptioner));
    let receipt = h.service.upload("a.png", png_bytes(48, 48)).await.unwrap();
    let response = wait_terminal(&h.service, &receipt.image_id).await;

    assert_eq!(response.status, ImageStatus::Success);
    assert!(response.data.metadata.caption.is_none());
    for preset in ThumbnailPreset::ALL {
        assert!(h
            .service
            .thumbnail(&receipt.image_id, preset.name())
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn listing_is_newest_first_and_complete() {
    let h = harness();
    let first = h.service.upload("a.png", png_bytes(16, 16)).await.unwrap();
    let second = h.service.upload("b.txt", b"x".to_vec()).await.unwrap();
    wait_terminal(&h.service, &first.image_id).await;

    let listed = h.service.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].data.image_id, second.image_id);
    assert_eq!(listed[1].data.image_id, first.image_id);
}

#[tokio::test]
async fn stats_over_mixture() {
    let h = harness();
    let good = h.service.upload("a.png", png_bytes(16, 16)).await.unwrap();
    h.service.upload("b.txt", b"x".to_vec()).await.unwrap();
    wait_terminal(&h.service, &good.image_id).await;

    let stats = h.service.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.success_rate, "50.00%");
    assert!(stats.average_processing_time_seconds >= 0.0);
}

#[tokio::test]
async fn thumbnail_read_gates() {
    let h = harness();
    let receipt = h.service.upload("a.png", png_bytes(16, 16)).await.unwrap();
    wait_terminal(&h.service, &receipt.image_id).await;

    assert!(matches!(
        h.service.thumbnail(&receipt.image_id, "gigantic").await,
        Err(ServiceError::BadRequest(_))
    ));
    assert!(matches!(
        h.service.thumbnail("no-such-id", "small").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(h.service.thumbnail(&receipt.image_id, "small").await.is_ok());
}
