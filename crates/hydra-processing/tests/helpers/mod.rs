//! Test helpers: fake collaborators and fixtures for pipeline tests.
//!
//! Run from workspace root: `cargo test -p hydra-processing`.

#![allow(dead_code)]

pub mod converter;
pub mod fixtures;
pub mod storage;

use hydra_core::InMemoryMetadataStore;
use hydra_processing::{Converter, PipelineConfig, RateLimit, UploadPipeline};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use storage::MemoryStorage;

/// Rate limit that never gets in the way of a test
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        rate_limit: RateLimit {
            quota_bytes: 1 << 20,
            tick: Duration::from_millis(1),
            chunk_size: 8 * 1024,
        },
        preview_max_width: 1024,
    }
}

pub struct TestPipeline {
    pub pipeline: UploadPipeline,
    pub storage: Arc<MemoryStorage>,
    pub metadata_store: Arc<InMemoryMetadataStore>,
}

pub fn setup_pipeline(converter: impl Converter + 'static, storage: MemoryStorage) -> TestPipeline {
    setup_pipeline_with(converter, storage, fast_config())
}

pub fn setup_pipeline_with(
    converter: impl Converter + 'static,
    storage: MemoryStorage,
    config: PipelineConfig,
) -> TestPipeline {
    let storage = Arc::new(storage);
    let metadata_store = Arc::new(InMemoryMetadataStore::new());
    let pipeline = UploadPipeline::new(
        storage.clone(),
        Arc::new(converter),
        metadata_store.clone(),
        config,
    );
    TestPipeline {
        pipeline,
        storage,
        metadata_store,
    }
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}
