//! Upload pipeline integration tests.
//!
//! Run with: `cargo test -p hydra-processing --test upload_test`

mod helpers;

use helpers::converter::{FakeConverter, TransformOutput};
use helpers::fixtures::{create_test_bytes, create_test_pdf, create_test_png};
use helpers::storage::MemoryStorage;
use helpers::{eventually, setup_pipeline, setup_pipeline_with};
use hydra_core::{
    AudioMeta, FileStatus, InMemoryMetadataStore, Meta, ThumbnailName, UploadType, VideoMeta,
};
use hydra_processing::{MediaConverter, PipelineConfig, RateLimit, UploadPipeline, UploadRequest};
use hydra_storage::{LocalStorage, Storage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_image_upload_end_to_end() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(
        LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .unwrap(),
    );
    let metadata_store = Arc::new(InMemoryMetadataStore::new());
    let pipeline = UploadPipeline::new(
        storage.clone(),
        Arc::new(MediaConverter::default()),
        metadata_store.clone(),
        helpers::fast_config(),
    );

    let png = create_test_png(1600, 900);
    let record = pipeline
        .upload_file(UploadRequest::new(Cursor::new(png), "holiday photo.png", UploadType::Image))
        .await
        .unwrap();

    assert_eq!(record.filename, "holiday_photo.jpg");
    assert_eq!(record.mime_type, "image/jpeg");
    assert_eq!(record.status, FileStatus::Temp);
    assert_eq!((record.width, record.height), (Some(1600), Some(900)));
    assert_eq!(record.thumbnails.len(), 4);

    let preview = record.thumbnails.get(ThumbnailName::Preview).unwrap();
    assert_eq!((preview.width, preview.height), (1024, 576));
    let small = record.thumbnails.get(ThumbnailName::Size32).unwrap();
    assert_eq!((small.width, small.height), (32, 32));

    let stored = storage.load(record.id).await.unwrap();
    assert_eq!(stored.len() as u64, record.size);
    assert_eq!(&stored[..2], &[0xFF, 0xD8]);
    for (_, thumbnail) in record.thumbnails.iter() {
        assert!(storage.exists(thumbnail.id).await.unwrap());
    }

    let registered = metadata_store.file(record.id).await.unwrap();
    assert_eq!(registered.width, Some(1600));
    assert_eq!(registered.thumbnails.len(), 4);
    assert!(matches!(metadata_store.metadata(record.id).await, Some(Meta::Image(_))));
}

#[tokio::test]
async fn test_profile_picture_is_public_and_stored_verbatim() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());
    let png = create_test_png(64, 64);

    let record = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(png.clone()),
            "me.png",
            UploadType::ProfilePicture,
        ))
        .await
        .unwrap();

    assert_eq!(record.status, FileStatus::Public);
    assert_eq!(record.filename, "me.png");
    assert_eq!(record.mime_type, "image/png");
    assert_eq!(t.storage.load(record.id).await.unwrap(), png);
    assert_eq!(record.thumbnails.len(), 4);
    // Derivatives only, no metadata reader
    assert_eq!(record.width, None);
    assert_eq!(t.storage.thumbnail_writes(), 1);
}

#[tokio::test]
async fn test_file_pdf_is_stored_verbatim_with_document_meta() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(
        LocalStorage::new(dir.path(), "http://localhost/files".to_string())
            .await
            .unwrap(),
    );
    let metadata_store = Arc::new(InMemoryMetadataStore::new());
    let pipeline = UploadPipeline::new(
        storage.clone(),
        Arc::new(MediaConverter::default()),
        metadata_store.clone(),
        helpers::fast_config(),
    );

    let pdf = create_test_pdf();
    let record = pipeline
        .upload_file(
            UploadRequest::new(Cursor::new(pdf.clone()), "report.pdf", UploadType::File)
                .with_content_type("application/pdf"),
        )
        .await
        .unwrap();

    assert_eq!(storage.load(record.id).await.unwrap(), pdf);
    assert_eq!(record.filename, "report.pdf");
    assert!(record.thumbnails.is_empty());
    assert_eq!((record.width, record.height), (Some(595), Some(842)));
    match metadata_store.metadata(record.id).await {
        Some(Meta::Pdf(meta)) => {
            assert_eq!(meta.page_count, 1);
            assert_eq!(meta.title.as_deref(), Some("Test Document"));
        }
        other => panic!("expected pdf metadata, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generic_file_runs_no_processors() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());
    let data = create_test_bytes(50_000);

    let record = t
        .pipeline
        .upload_file(UploadRequest::new(Cursor::new(data.clone()), "archive.zip", UploadType::File))
        .await
        .unwrap();

    assert_eq!(record.mime_type, "application/zip");
    assert_eq!(record.size, 50_000);
    assert_eq!(t.storage.load(record.id).await.unwrap(), data);
    assert_eq!(t.storage.save_calls(), 1);
    assert!(t.metadata_store.metadata(record.id).await.is_none());
}

#[tokio::test]
async fn test_video_is_transcoded_and_measured() {
    let converter = FakeConverter {
        meta: Meta::Video(VideoMeta {
            width: 1280,
            height: 720,
            duration_secs: 12.5,
            codec: Some("h264".to_string()),
            bitrate: None,
            frame_rate: Some(30.0),
        }),
        transform: TransformOutput::Fixed(b"....ftypisom transcoded".to_vec()),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let record = t
        .pipeline
        .upload_file(
            UploadRequest::new(
                Cursor::new(create_test_bytes(10_000)),
                "clip.mov",
                UploadType::Video,
            )
            .with_content_type("video/quicktime"),
        )
        .await
        .unwrap();

    assert_eq!(record.filename, "clip.mp4");
    assert_eq!(record.mime_type, "video/mp4");
    assert_eq!((record.width, record.height), (Some(1280), Some(720)));
    assert_eq!(record.size, 23);
    assert_eq!(
        t.storage.load(record.id).await.unwrap(),
        b"....ftypisom transcoded"
    );
    assert!(matches!(t.storage.meta(record.id).await, Some(Meta::Video(_))));
    assert_eq!(record.thumbnails.len(), 4);
}

#[tokio::test]
async fn test_voice_has_no_dimensions_or_thumbnails() {
    let converter = FakeConverter {
        meta: Meta::Voice(AudioMeta {
            duration_secs: 4.0,
            codec: Some("opus".to_string()),
            bitrate: None,
            sample_rate: Some(48_000),
            channels: Some(1),
        }),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let record = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_bytes(2_000)),
            "note.ogg",
            UploadType::Voice,
        ))
        .await
        .unwrap();

    assert_eq!(record.filename, "note.mp3");
    assert_eq!(record.mime_type, "audio/mpeg");
    assert_eq!((record.width, record.height), (None, None));
    assert!(record.thumbnails.is_empty());
    assert_eq!(t.storage.thumbnail_writes(), 0);
    assert!(matches!(t.metadata_store.metadata(record.id).await, Some(Meta::Voice(_))));
}

#[tokio::test]
async fn test_early_response_does_not_wait_for_processors() {
    let converter = FakeConverter {
        processor_delay: Duration::from_millis(500),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let start = std::time::Instant::now();
    let record = t
        .pipeline
        .upload_file(
            UploadRequest::new(
                Cursor::new(create_test_bytes(4_096)),
                "avatar.png",
                UploadType::ProfilePicture,
            )
            .with_early_response(true),
        )
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(record.thumbnails.is_empty());
    assert_eq!(record.size, 4_096);

    // Processors finish in the background and are merged
    let store = t.metadata_store.clone();
    let id = record.id;
    eventually(|| {
        let store = store.clone();
        async move {
            store
                .file(id)
                .await
                .is_some_and(|r| r.thumbnails.len() == 4)
        }
    })
    .await;
}

#[tokio::test]
async fn test_full_response_waits_for_processors() {
    let converter = FakeConverter {
        processor_delay: Duration::from_millis(200),
        ..FakeConverter::default()
    };
    let t = setup_pipeline(converter, MemoryStorage::new());

    let start = std::time::Instant::now();
    let record = t
        .pipeline
        .upload_file(UploadRequest::new(
            Cursor::new(create_test_bytes(4_096)),
            "place.jpg",
            UploadType::PlacePicture,
        ))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(record.thumbnails.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_spreads_upload_over_ticks() {
    let config = PipelineConfig {
        rate_limit: RateLimit {
            quota_bytes: 3,
            tick: Duration::from_secs(1),
            chunk_size: 3,
        },
        preview_max_width: 1024,
    };
    let t = setup_pipeline_with(FakeConverter::default(), MemoryStorage::new(), config);

    let start = tokio::time::Instant::now();
    let record = t
        .pipeline
        .upload_file(UploadRequest::new(&b"0123456789"[..], "notes.txt", UploadType::File))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(4));
    assert_eq!(t.storage.load(record.id).await.unwrap(), b"0123456789");
}

#[tokio::test]
async fn test_uploads_get_distinct_ids() {
    let t = setup_pipeline(FakeConverter::default(), MemoryStorage::new());
    let mut ids = Vec::new();
    for _ in 0..3 {
        let record = t
            .pipeline
            .upload_file(UploadRequest::new(&b"same bytes"[..], "a.txt", UploadType::File))
            .await
            .unwrap();
        ids.push(record.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(t.metadata_store.len().await, 3);
}
