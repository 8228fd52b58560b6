use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::validate::validate_file;
use crate::config::UploadConfig;
use crate::llm::ocr::TextExtractor;
use crate::models::{
    AnnotationStatus, FileOutcome, IncomingFile, MemePatch, MemeRecord, UploadAction,
};
use crate::storage::{MemeTable, ObjectStore};

const DEFAULT_MIME: &str = "image/jpeg";

/// Where a file name currently stands across the table and the bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStatus {
    pub exists_in_db: bool,
    pub exists_in_storage: bool,
    pub image_id: Option<String>,
    pub current_status: Option<AnnotationStatus>,
}

impl FileStatus {
    pub fn can_upload(&self) -> bool {
        !self.exists_in_storage
    }
}

/// Validates, records and stores uploaded memes, one task per file.
pub struct UploadPipeline {
    table: Arc<dyn MemeTable>,
    objects: Arc<dyn ObjectStore>,
    ocr: Arc<dyn TextExtractor>,
    config: UploadConfig,
    /// Shared across requests so concurrent batches respect one bound
    permits: Arc<Semaphore>,
}

enum Slot {
    Done(FileOutcome),
    Running(Option<String>, JoinHandle<FileOutcome>),
}

impl UploadPipeline {
    pub fn new(
        table: Arc<dyn MemeTable>,
        objects: Arc<dyn ObjectStore>,
        ocr: Arc<dyn TextExtractor>,
        config: UploadConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_uploads.max(1)));
        Self {
            table,
            objects,
            ocr,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Process every file with at most `max_concurrent_uploads` in flight.
    ///
    /// Results come back in input order. A file that fails, or whose task
    /// panics, never affects the others. Repeated names within one request
    /// are only processed once.
    pub async fn process_files(self: &Arc<Self>, files: Vec<IncomingFile>) -> Vec<FileOutcome> {
        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(files.len());

        for file in files {
            if let Some(name) = file.file_name.as_deref().filter(|n| !n.is_empty()) {
                if !seen.insert(name.to_string()) {
                    tracing::warn!("Duplicate file name '{name}' in request, skipping");
                    slots.push(Slot::Done(FileOutcome::skipped(
                        name,
                        "Duplicate file name in request",
                    )));
                    continue;
                }
            }

            let filename = file.file_name.clone();
            let pipeline = Arc::clone(self);
            let handle = tokio::spawn(async move {
                let _permit = match Arc::clone(&pipeline.permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!("Upload permits unavailable: {e}");
                        return FileOutcome::failed(
                            file.file_name.as_deref(),
                            UploadAction::ErrorOccurred,
                            format!("Upload queue closed: {e}"),
                        );
                    }
                };
                pipeline.process_single_file(file).await
            });
            slots.push(Slot::Running(filename, handle));
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            let outcome = match slot {
                Slot::Done(outcome) => outcome,
                Slot::Running(filename, handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(
                            "Upload task for '{}' aborted: {e}",
                            filename.as_deref().unwrap_or("<unnamed>")
                        );
                        FileOutcome::failed(
                            filename.as_deref(),
                            UploadAction::ErrorOccurred,
                            format!("Unexpected error: {e}"),
                        )
                    }
                },
            };
            results.push(outcome);
        }
        results
    }

    /// Run one file through validation, status check, record and upload.
    pub async fn process_single_file(&self, file: IncomingFile) -> FileOutcome {
        let Some(file_name) = file.file_name.clone().filter(|n| !n.is_empty()) else {
            return FileOutcome::failed(None, UploadAction::Skipped, "File name is required");
        };

        if let Err(errors) = validate_file(
            Some(&file_name),
            file.content_type.as_deref(),
            file.data.len(),
            self.config.max_file_size,
        ) {
            return FileOutcome::failed(Some(&file_name), UploadAction::Skipped, errors.join("; "));
        }

        let mut record_id = None;
        match self.try_upload(&file_name, file, &mut record_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = format!("{e:#}");
                tracing::error!("Failed to process file '{file_name}': {error}");
                if let Some(image_id) = &record_id {
                    self.mark_failed(image_id, &file_name, &error).await;
                }
                FileOutcome::failed(Some(&file_name), UploadAction::ErrorOccurred, error)
            }
        }
    }

    /// `record_id` is set as soon as a table row exists for this file, so the
    /// caller knows which row to mark failed.
    async fn try_upload(
        &self,
        file_name: &str,
        file: IncomingFile,
        record_id: &mut Option<String>,
    ) -> Result<FileOutcome> {
        let status = self.check_file_status(file_name).await?;

        let (existing, action) = match (status.exists_in_db, status.image_id) {
            (true, _) if status.exists_in_storage => {
                return Ok(FileOutcome::skipped(
                    file_name,
                    "File already exists in database and storage",
                ));
            }
            (true, Some(image_id)) => (Some(image_id), UploadAction::UploadToStorage),
            _ => (None, UploadAction::NewUpload),
        };
        record_id.clone_from(&existing);

        if file.data.is_empty() {
            anyhow::bail!("File content is empty");
        }
        let mime = file
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        let image_id = self
            .prepare_record(file_name, &file.data, &mime, existing)
            .await
            .context("Failed to create/update DB record")?;
        *record_id = Some(image_id.clone());

        self.objects
            .upload(&image_id, file.data, &mime, &self.config.cache_control)
            .await
            .with_context(|| format!("Failed to upload {image_id} to storage"))?;

        self.mark_uploaded(&image_id, file_name).await;

        tracing::debug!("Stored '{file_name}' as {image_id} ({action:?})");
        Ok(FileOutcome::success(file_name, image_id, action))
    }

    /// Look the file name up in the table and, when found, its object in the bucket.
    ///
    /// Table errors propagate. Bucket lookup errors count as "not stored".
    pub async fn check_file_status(&self, file_name: &str) -> Result<FileStatus> {
        let record = self
            .table
            .find_by_file_name(file_name)
            .await
            .context("Failed to check file status")?;

        let Some(record) = record else {
            return Ok(FileStatus {
                exists_in_db: false,
                exists_in_storage: false,
                image_id: None,
                current_status: None,
            });
        };

        let exists_in_storage = match self.objects.exists(&record.image_id).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(
                    "Storage lookup for '{file_name}' ({}) failed, treating as absent: {e:#}",
                    record.image_id
                );
                false
            }
        };

        Ok(FileStatus {
            exists_in_db: true,
            exists_in_storage,
            image_id: Some(record.image_id),
            current_status: record.annotation_status,
        })
    }

    /// Put the row into `uploading`, creating it (with OCR text) if needed.
    async fn prepare_record(
        &self,
        file_name: &str,
        data: &[u8],
        mime: &str,
        existing: Option<String>,
    ) -> Result<String> {
        if let Some(image_id) = existing {
            let touched = self
                .table
                .update_by_image_id(&image_id, &MemePatch::uploading())
                .await?;
            if touched > 0 {
                return Ok(image_id);
            }
            tracing::warn!("Row {image_id} for '{file_name}' disappeared, recreating it");
            return self.insert_record(file_name, data, mime, image_id).await;
        }

        self.insert_record(file_name, data, mime, Uuid::new_v4().to_string())
            .await
    }

    async fn insert_record(
        &self,
        file_name: &str,
        data: &[u8],
        mime: &str,
        image_id: String,
    ) -> Result<String> {
        let ocr_text = self
            .ocr
            .extract_text(data, mime)
            .await
            .context("Failed to extract text from image")?;

        let record = MemeRecord {
            image_id: image_id.clone(),
            file_name: file_name.to_string(),
            annotation_status: Some(AnnotationStatus::Uploading),
            ocr_text: Some(ocr_text),
            ..Default::default()
        };
        self.table.insert(&record).await?;
        Ok(image_id)
    }

    async fn mark_uploaded(&self, image_id: &str, file_name: &str) {
        let url = self.objects.public_url(image_id);
        if let Err(e) = self
            .table
            .update_by_image_id(image_id, &MemePatch::uploaded(url))
            .await
        {
            tracing::error!("Failed to update success status for '{file_name}': {e:#}");
        }
    }

    async fn mark_failed(&self, image_id: &str, file_name: &str, error: &str) {
        if let Err(e) = self
            .table
            .update_by_image_id(image_id, &MemePatch::upload_failed(error))
            .await
        {
            tracing::error!("Failed to update error status for '{file_name}': {e:#}");
        }
    }
}
