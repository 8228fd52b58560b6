use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle of a meme row in the metadata table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Uploading,
    Uploaded,
    UploadFailed,
    HalfAnnotated,
    FullyAnnotated,
}

/// A row of the metadata table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemeRecord {
    /// Table primary key, assigned by the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub image_id: String,
    pub file_name: String,
    /// Statuses written by other tools read as `None`
    #[serde(default, deserialize_with = "lenient_status")]
    pub annotation_status: Option<AnnotationStatus>,
    #[serde(default)]
    pub uploaded_meme_url: Option<String>,
    #[serde(default)]
    pub err_msg: Option<String>,
    #[serde(default)]
    pub ocr_text: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub heroes: Option<Vec<String>>,
    #[serde(default)]
    pub villains: Option<Vec<String>>,
    #[serde(default)]
    pub victims: Option<Vec<String>>,
    #[serde(default)]
    pub other_roles: Option<Vec<String>>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<AnnotationStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Partial update of a meme row.
///
/// Outer `None` leaves the column untouched; `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MemePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_status: Option<AnnotationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_meme_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heroes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub villains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victims: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl MemePatch {
    /// Row is about to receive its file: status `uploading`, url and error cleared.
    pub fn uploading() -> Self {
        Self {
            annotation_status: Some(AnnotationStatus::Uploading),
            uploaded_meme_url: Some(None),
            err_msg: Some(None),
            ..Default::default()
        }
    }

    pub fn uploaded(url: String) -> Self {
        Self {
            annotation_status: Some(AnnotationStatus::Uploaded),
            uploaded_meme_url: Some(Some(url)),
            err_msg: Some(None),
            ..Default::default()
        }
    }

    pub fn upload_failed(error: &str) -> Self {
        Self {
            annotation_status: Some(AnnotationStatus::UploadFailed),
            err_msg: Some(Some(error.to_string())),
            ..Default::default()
        }
    }

    /// Moves the row to `half_annotated`. Without an overview the
    /// annotation columns are left as they are.
    pub fn overview(overview: Option<&MemeOverview>) -> Self {
        let Some(overview) = overview else {
            return Self {
                annotation_status: Some(AnnotationStatus::HalfAnnotated),
                ..Default::default()
            };
        };
        Self {
            annotation_status: Some(AnnotationStatus::HalfAnnotated),
            explanation: Some(overview.explanation.clone()),
            genre: Some(overview.genre.clone()),
            heroes: Some(overview.heroes.clone()),
            villains: Some(overview.villains.clone()),
            victims: Some(overview.victims.clone()),
            other_roles: Some(overview.other_roles.clone()),
            sentiment: Some(overview.sentiment.clone()),
            ..Default::default()
        }
    }

    pub fn context(context: &str) -> Self {
        Self {
            annotation_status: Some(AnnotationStatus::FullyAnnotated),
            context: Some(context.to_string()),
            ..Default::default()
        }
    }

    /// Apply this patch to an in-memory row.
    pub fn apply(&self, record: &mut MemeRecord) {
        if let Some(status) = self.annotation_status {
            record.annotation_status = Some(status);
        }
        if let Some(url) = &self.uploaded_meme_url {
            record.uploaded_meme_url = url.clone();
        }
        if let Some(err) = &self.err_msg {
            record.err_msg = err.clone();
        }
        if let Some(v) = &self.explanation {
            record.explanation = Some(v.clone());
        }
        if let Some(v) = &self.genre {
            record.genre = Some(v.clone());
        }
        if let Some(v) = &self.heroes {
            record.heroes = Some(v.clone());
        }
        if let Some(v) = &self.villains {
            record.villains = Some(v.clone());
        }
        if let Some(v) = &self.victims {
            record.victims = Some(v.clone());
        }
        if let Some(v) = &self.other_roles {
            record.other_roles = Some(v.clone());
        }
        if let Some(v) = &self.sentiment {
            record.sentiment = Some(v.clone());
        }
        if let Some(v) = &self.context {
            record.context = Some(v.clone());
        }
    }
}

/// A file as received in the multipart body.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: bytes::Bytes,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadAction {
    NewUpload,
    UploadToStorage,
    NoUploadNeeded,
    Skipped,
    ErrorOccurred,
}

/// Result of processing one file of a bulk upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOutcome {
    pub filename: Option<String>,
    pub status: OutcomeStatus,
    pub action: UploadAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileOutcome {
    pub fn success(filename: &str, image_id: String, action: UploadAction) -> Self {
        Self {
            filename: Some(filename.to_string()),
            status: OutcomeStatus::Success,
            action,
            image_id: Some(image_id),
            error: None,
            message: None,
        }
    }

    pub fn failed(filename: Option<&str>, action: UploadAction, error: impl Into<String>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            status: OutcomeStatus::Failed,
            action,
            image_id: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn skipped(filename: &str, message: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.to_string()),
            status: OutcomeStatus::Skipped,
            action: UploadAction::NoUploadNeeded,
            image_id: None,
            error: None,
            message: Some(message.into()),
        }
    }
}

/// Response of `POST /upload/memes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUploadReport {
    pub total_files: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub skipped_uploads: usize,
    pub results: Vec<FileOutcome>,
    pub summary: UploadSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub success_rate: String,
    pub successful_files: Vec<SuccessfulFile>,
    pub failed_files: Vec<FailedFile>,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulFile {
    pub filename: Option<String>,
    pub action: UploadAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub filename: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub filename: Option<String>,
    pub message: String,
}

/// Body of the annotation endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotateRequest {
    pub meme_id: String,
    pub meme_url: String,
}

/// Structured overview produced by the vision model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemeOverview {
    /// Where the humor of the meme lies
    pub explanation: String,
    /// e.g. political, entertainment, sports, other
    pub genre: String,
    #[serde(default)]
    pub heroes: Vec<String>,
    #[serde(default)]
    pub villains: Vec<String>,
    #[serde(default)]
    pub victims: Vec<String>,
    #[serde(default)]
    pub other_roles: Vec<String>,
    /// positive, negative or neutral
    pub sentiment: String,
}

/// Response of `POST /annotation/annotate`. Overview fields are null when
/// the model gave no usable overview.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotateResponse {
    pub image_url: String,
    pub explanation: Option<String>,
    pub genre: Option<String>,
    pub heroes: Option<Vec<String>>,
    pub villains: Option<Vec<String>>,
    pub victims: Option<Vec<String>>,
    pub other_roles: Option<Vec<String>>,
    pub sentiment: Option<String>,
}

impl AnnotateResponse {
    pub fn new(image_url: String, overview: Option<MemeOverview>) -> Self {
        match overview {
            Some(o) => Self {
                image_url,
                explanation: Some(o.explanation),
                genre: Some(o.genre),
                heroes: Some(o.heroes),
                villains: Some(o.villains),
                victims: Some(o.victims),
                other_roles: Some(o.other_roles),
                sentiment: Some(o.sentiment),
            },
            None => Self {
                image_url,
                explanation: None,
                genre: None,
                heroes: None,
                villains: None,
                victims: None,
                other_roles: None,
                sentiment: None,
            },
        }
    }
}

/// Error body of the annotation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct AgentError {
    pub error: String,
    pub message: String,
}
