use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::errors::PipelineResult;

// Process-lifetime memo of finished predictions, keyed by target date.
// Each key owns a once-cell, so concurrent requests for the same date wait
// on a single computation instead of each running the pipeline. A failed
// computation leaves the cell empty and the next request tries again.
pub struct ForecastCache<V> {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<V>>>>>,
}

impl<V> Default for ForecastCache<V> {
    fn default() -> Self {
        ForecastCache {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> ForecastCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<Arc<V>>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub async fn get_or_try_insert<F, Fut>(&self, key: &str, compute: F) -> PipelineResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<V>>,
    {
        let cell = self.cell(key);
        if let Some(value) = cell.get() {
            log::info!("Cache hit for {}", key);
            return Ok(value.clone());
        }

        let value = cell
            .get_or_try_init(|| async {
                log::info!("Cache miss for {}, running pipeline", key);
                compute().await.map(Arc::new)
            })
            .await?;
        Ok(value.clone())
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // Number of finished entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Drops every entry; requests already waiting on a cell keep their own handle
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }
}
