use crate::result::BreakdownResult;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store for completed breakdown results.
///
/// The pipeline persists the full result (complete base64 payloads) here;
/// callers receive the slim form and fetch the full record by task id when
/// they need the payloads back.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save_result(&self, result: &BreakdownResult) -> Result<()>;
    async fn get_result(&self, task_id: &str) -> Result<Option<BreakdownResult>>;
    async fn delete_result(&self, task_id: &str) -> Result<()>;
    async fn list_task_ids(&self) -> Result<Vec<String>>;
}

/// Process-local task store. One entry per pipeline invocation, keyed by
/// task id; entries live until explicitly deleted or the process exits.
#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    inner: Arc<RwLock<HashMap<String, BreakdownResult>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn save_result(&self, result: &BreakdownResult) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insert(result.task_id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, task_id: &str) -> Result<Option<BreakdownResult>> {
        let inner = self.inner.read().await;
        Ok(inner.get(task_id).cloned())
    }

    async fn delete_result(&self, task_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.remove(task_id);
        Ok(())
    }

    async fn list_task_ids(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<String> = inner.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaMetadata;

    fn result_with_id(task_id: &str) -> BreakdownResult {
        BreakdownResult {
            task_id: task_id.to_string(),
            duration: 1.0,
            resolution: "unknown".to_string(),
            metadata: MediaMetadata {
                duration_secs: 1.0,
                width: None,
                height: None,
                frame_rate: None,
                size_bytes: None,
                bit_rate: None,
            },
            audio_url: None,
            audio_base64: None,
            full_transcript: None,
            segment_count: 0,
            segments: vec![],
        }
    }

    #[tokio::test]
    async fn test_save_get_delete_roundtrip() {
        let store = MemoryTaskStore::new();
        let result = result_with_id("task-a");

        store.save_result(&result).await.expect("save");
        let fetched = store.get_result("task-a").await.expect("get");
        assert_eq!(fetched.as_ref().map(|r| r.task_id.as_str()), Some("task-a"));

        assert!(store.get_result("task-b").await.expect("get").is_none());

        store.delete_result("task-a").await.expect("delete");
        assert!(store.get_result("task-a").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = MemoryTaskStore::new();
        store.save_result(&result_with_id("b")).await.expect("save");
        store.save_result(&result_with_id("a")).await.expect("save");

        let ids = store.list_task_ids().await.expect("list");
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
