// src/mirror/memory.rs - In-process mirror table
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{MirrorStore, StoreError};

/// Rows held in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<usize>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }

    /// Row indices written so far, in call order.
    pub async fn writes(&self) -> Vec<usize> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl MirrorStore for MemorySheet {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn write_row(&self, index: usize, values: &[String]) -> Result<(), StoreError> {
        if index == 0 {
            return Err(StoreError::InvalidRow(index));
        }
        let mut rows = self.rows.lock().await;
        if rows.len() < index {
            rows.resize(index, Vec::new());
        }
        rows[index - 1] = values.to_vec();
        self.writes.lock().await.push(index);
        Ok(())
    }
}
