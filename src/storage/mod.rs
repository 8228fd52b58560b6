//! Interfaces to the two stores the service writes to.
//!
//! - [`MemeTable`]: the relational metadata table (one row per meme).
//! - [`ObjectStore`]: the bucket holding the image bytes, keyed by `image_id`.
//!
//! The service only sees these traits; [`supabase`] talks to a hosted
//! Supabase project over REST and [`memory`] keeps everything in-process.

pub mod memory;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::models::{MemePatch, MemeRecord};

#[async_trait]
pub trait MemeTable: Send + Sync {
    /// First row whose `file_name` matches.
    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<MemeRecord>>;

    async fn insert(&self, record: &MemeRecord) -> Result<()>;

    /// Returns the number of rows touched.
    async fn update_by_image_id(&self, image_id: &str, patch: &MemePatch) -> Result<usize>;

    /// Update keyed on the table's primary key. Returns the number of rows touched.
    async fn update_by_id(&self, id: &str, patch: &MemePatch) -> Result<usize>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Publicly reachable URL of an object.
    fn public_url(&self, key: &str) -> String;
}
