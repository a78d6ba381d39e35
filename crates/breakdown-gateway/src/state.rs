use common::task_store::{MemoryTaskStore, TaskStore};
use media_pipeline::PipelineConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PipelineConfig,
    store: Arc<MemoryTaskStore>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store: Arc::new(MemoryTaskStore::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> Arc<dyn TaskStore> {
        self.inner.store.clone()
    }

    /// Per-request token derived from the server shutdown token, so a
    /// shutting-down gateway cancels in-flight pipeline runs.
    pub fn request_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}
