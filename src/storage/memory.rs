use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{MemeTable, ObjectStore};
use crate::models::{AnnotationStatus, MemePatch, MemeRecord};

/// In-process metadata table. Rows get sequential numeric ids.
#[derive(Default)]
pub struct MemoryTable {
    rows: RwLock<Vec<MemeRecord>>,
    next_id: AtomicU64,
    /// File names whose lookups fail, for exercising error paths
    failing_lookups: RwLock<HashSet<String>>,
    /// Statuses whose updates fail
    failing_updates: RwLock<HashSet<AnnotationStatus>>,
    /// Rows deleted just before their next `update_by_image_id`
    vanishing: RwLock<HashSet<String>>,
    failing_ping: AtomicBool,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `find_by_file_name` for `file_name` return an error.
    pub fn fail_lookups_for(&self, file_name: &str) {
        self.failing_lookups.write().insert(file_name.to_string());
    }

    /// Make every update that sets `status` return an error.
    pub fn fail_updates_to(&self, status: AnnotationStatus) {
        self.failing_updates.write().insert(status);
    }

    /// Delete the row for `image_id` when it is next updated by image id,
    /// so that update touches zero rows.
    pub fn vanish_before_update(&self, image_id: &str) {
        self.vanishing.write().insert(image_id.to_string());
    }

    pub fn fail_pings(&self) {
        self.failing_ping.store(true, Ordering::Relaxed);
    }

    pub fn rows(&self) -> Vec<MemeRecord> {
        self.rows.read().clone()
    }

    pub fn get_by_image_id(&self, image_id: &str) -> Option<MemeRecord> {
        self.rows
            .read()
            .iter()
            .find(|r| r.image_id == image_id)
            .cloned()
    }

    fn check_update(&self, patch: &MemePatch) -> Result<()> {
        if let Some(status) = patch.annotation_status {
            if self.failing_updates.read().contains(&status) {
                anyhow::bail!("update to {status:?} failed");
            }
        }
        Ok(())
    }
}

fn id_matches(record: &MemeRecord, id: &str) -> bool {
    match &record.id {
        Some(serde_json::Value::String(s)) => s == id,
        Some(serde_json::Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

#[async_trait]
impl MemeTable for MemoryTable {
    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<MemeRecord>> {
        if self.failing_lookups.read().contains(file_name) {
            anyhow::bail!("lookup failed for '{file_name}'");
        }
        Ok(self
            .rows
            .read()
            .iter()
            .find(|r| r.file_name == file_name)
            .cloned())
    }

    async fn insert(&self, record: &MemeRecord) -> Result<()> {
        let mut rows = self.rows.write();
        if rows.iter().any(|r| r.image_id == record.image_id) {
            anyhow::bail!("duplicate image_id {}", record.image_id);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut row = record.clone();
        row.id = Some(serde_json::Value::from(id));
        rows.push(row);
        Ok(())
    }

    async fn update_by_image_id(&self, image_id: &str, patch: &MemePatch) -> Result<usize> {
        self.check_update(patch)?;
        let mut rows = self.rows.write();
        if self.vanishing.write().remove(image_id) {
            rows.retain(|r| r.image_id != image_id);
        }
        let mut touched = 0;
        for row in rows.iter_mut().filter(|r| r.image_id == image_id) {
            patch.apply(row);
            touched += 1;
        }
        Ok(touched)
    }

    async fn update_by_id(&self, id: &str, patch: &MemePatch) -> Result<usize> {
        self.check_update(patch)?;
        let mut rows = self.rows.write();
        let mut touched = 0;
        for row in rows.iter_mut().filter(|r| id_matches(r, id)) {
            patch.apply(row);
            touched += 1;
        }
        Ok(touched)
    }

    async fn ping(&self) -> Result<()> {
        if self.failing_ping.load(Ordering::Relaxed) {
            anyhow::bail!("table unreachable");
        }
        Ok(())
    }
}

/// In-process object bucket.
pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    /// Keys whose uploads fail
    failing_uploads: RwLock<HashSet<String>>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub cache_control: String,
}

impl MemoryObjectStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            failing_uploads: RwLock::new(HashSet::new()),
        }
    }

    pub fn fail_uploads_for(&self, key: &str) {
        self.failing_uploads.write().insert(key.to_string());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(key))
    }

    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        if self.failing_uploads.read().contains(key) {
            anyhow::bail!("upload rejected for {key}");
        }
        let mut objects = self.objects.write();
        if objects.contains_key(key) {
            anyhow::bail!("object {key} already exists");
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}
