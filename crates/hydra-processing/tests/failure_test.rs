//! Failure handling of the upload pipeline.
//!
//! Run with: `cargo test -p hydra-processing --test failure_test`

mod helpers;

use helpers::converter::{FakeConverter, TransformOutput};
use helpers::fixtures::{create_test_bytes, create_test_png, CountingReader, FailingReader};
use helpers::storage::MemoryStorage;
use helpers::{eventually, setup_pipeline, setup_pipeline_with, TestPipeline};
use hydra_core::{AppError, ThumbnailName, UploadType};
use hydra_processing::{PipelineConfig, RateLimit, UploadRequest};
use std::io::Cursor;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Pipeline that ingests 10 bytes every 10ms
fn slow_pipeline() -> TestPipeline {
    setup_pipeline_with(
        FakeConverter::default(),
        MemoryStorage::new(),
        PipelineConfig {
            rate_limit: RateLimit {
                quota_bytes: 10,
                tick: Duration::from_millis(10),
                chunk_size: 10,
            },
            preview_max_width: 1024,
        },
    )
}

/// Drop an upload of 1000 bytes after 100ms, then let its background tasks settle
async fn cancel_mid_upload(t: &TestPipeline, filename: &str, upload_type: UploadType) {
    let request = UploadRequest::new(Cursor::new(create_test_bytes(1000)), filename, upload_type);
    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        t.pipeline.upload_file(request),
    )
    .await;
    assert!(outcome.is_err(), "upload finished before it was cancelled");

    let storage = t.storage.clone();
    eventually(|| {
        let storage = Arc::clone(&storage);
        async move { storage.save_calls() >= 1 }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_cancelled_upload_stores_nothing() {
    let t = slow_pipeline();

    cancel_mid_upload(&t, "notes.txt", UploadType::File).await;

    assert_eq!(t.storage.blob_count().await, 0);
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_upload_leaves_no_derivatives() {
    let t = slow_pipeline();

    cancel_mid_upload(&t, "me.png", UploadType::ProfilePicture).await;

    assert_eq!(t.storage.blob_count().await, 0);
    assert!(t.storage.derivative_ids().await.is_empty());
    assert_eq!(t.storage.thumbnail_writes(), 0);
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_mismatched_type_is_rejected_before_reading() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());
    let (reader, read) = CountingReader::new(create_test_bytes(10_000));

    let err = t
        .pipeline
        .upload_file(
            UploadRequest::new(reader, "song.mp3", UploadType::Video)
                .with_content_type("audio/mpeg"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("mime_type")));
    assert_eq!(read.load(Ordering::SeqCst), 0);
    assert_eq!(t.storage.save_calls(), 0);
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_unrecognized_content_cannot_be_an_image() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());

    let err = t
        .pipeline
        .upload_file(UploadRequest::new(&b"\x00\x01"[..], "blob.bin", UploadType::Image))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("application/octet-stream")));
    assert_eq!(t.storage.save_calls(), 0);
}

#[tokio::test]
async fn test_storage_failure_is_fatal_and_discards_derivatives() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::failing_canonical());

    let err = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_bytes(20_000)),
            "me.png",
            UploadType::ProfilePicture,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StorageFailure(ref m) if m.contains("bucket unavailable")));
    assert!(err.is_fatal());

    // Derivatives that made it to storage are removed once the processors are done
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let storage = t.storage.clone();
    eventually(|| {
        let storage = Arc::clone(&storage);
        async move { storage.blob_count().await == 0 }
    })
    .await;
    assert_eq!(t.storage.thumbnail_writes(), 0);
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_rejected_jpeg_output_is_fatal_for_images() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::failing_canonical());

    let err = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_png(64, 64)),
            "photo.png",
            UploadType::Image,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StorageFailure(ref m) if m.contains("bucket unavailable")));
    assert!(err.is_fatal());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let storage = t.storage.clone();
    eventually(|| {
        let storage = Arc::clone(&storage);
        async move { storage.blob_count().await == 0 }
    })
    .await;
    assert_eq!(t.storage.thumbnail_writes(), 0);
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_single_processor_failure_is_not_fatal() {
    let converter = FakeConverter {
        failing_thumbnail: Some(64),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let record = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_bytes(8_000)),
            "place.webp",
            UploadType::PlacePicture,
        ))
        .await
        .unwrap();

    assert_eq!(record.thumbnails.len(), 3);
    assert!(record.thumbnails.get(ThumbnailName::Size64).is_none());
    assert!(record.thumbnails.get(ThumbnailName::Size32).is_some());
    assert!(record.thumbnails.get(ThumbnailName::Preview).is_some());
    assert_eq!(t.storage.derivative_ids().await.len(), 3);
}

#[tokio::test]
async fn test_empty_transform_output_is_transform_failure() {
    let converter = FakeConverter {
        transform: TransformOutput::Fixed(Vec::new()),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let err = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_bytes(5_000)),
            "photo.jpg",
            UploadType::Image,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransformFailure(_)));
    assert!(err.is_fatal());
    assert!(t.metadata_store.is_empty().await);
}

#[tokio::test]
async fn test_transform_error_wins_over_downstream_storage_error() {
    let converter = FakeConverter {
        transform: TransformOutput::Fail("unsupported codec".to_string()),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let err = t
        .pipeline
        .upload_file(
            UploadRequest::new(
                Cursor::new(create_test_bytes(5_000)),
                "track.flac",
                UploadType::Audio,
            )
            .with_content_type("audio/flac"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransformFailure(ref m) if m.contains("unsupported codec")));
}

#[tokio::test]
async fn test_source_read_error_is_bad_request() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());

    let err = t
        .pipeline
        .upload_file(UploadRequest::new(
            FailingReader::after(create_test_bytes(3_000)),
            "partial.txt",
            UploadType::File,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("client disconnected")));
    assert_eq!(t.storage.blob_count().await, 0);
}
