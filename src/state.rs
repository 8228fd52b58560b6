use std::sync::Arc;
use std::time::Duration;

use crate::config::{Backend, Config};
use crate::llm::ocr::{LlmTextExtractor, TextExtractor};
use crate::search::serper::{SerperClient, WebSearch};
use crate::storage::memory::{MemoryObjectStore, MemoryTable};
use crate::storage::supabase::{SupabaseProject, SupabaseStorage, SupabaseTable};
use crate::storage::{MemeTable, ObjectStore};
use crate::upload::pipeline::UploadPipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub table: Arc<dyn MemeTable>,
    pub search: Arc<dyn WebSearch>,
    pub uploads: Arc<UploadPipeline>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;

        let (table, objects): (Arc<dyn MemeTable>, Arc<dyn ObjectStore>) = match config.backend {
            Backend::Supabase => {
                let (url, key) = config.supabase.credentials()?;
                let project = SupabaseProject::new(url, key);
                (
                    Arc::new(SupabaseTable::new(
                        http_client.clone(),
                        project.clone(),
                        &config.supabase.table,
                    )),
                    Arc::new(SupabaseStorage::new(
                        http_client.clone(),
                        project,
                        &config.supabase.bucket,
                    )),
                )
            }
            Backend::Memory => {
                tracing::warn!("Using in-memory storage; nothing will persist across restarts");
                (
                    Arc::new(MemoryTable::new()),
                    Arc::new(MemoryObjectStore::new(&format!(
                        "memory://{}",
                        config.supabase.bucket
                    ))),
                )
            }
        };

        let ocr = Arc::new(LlmTextExtractor::new(
            http_client.clone(),
            config.llm.clone(),
        ));
        let search = Arc::new(SerperClient::new(
            http_client.clone(),
            config.search.clone(),
        ));

        Ok(Self::with_services(config, http_client, table, objects, ocr, search))
    }

    /// Assemble state from already-built services.
    pub fn with_services(
        config: Config,
        http_client: reqwest::Client,
        table: Arc<dyn MemeTable>,
        objects: Arc<dyn ObjectStore>,
        ocr: Arc<dyn TextExtractor>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        let uploads = Arc::new(UploadPipeline::new(
            table.clone(),
            objects,
            ocr,
            config.upload.clone(),
        ));
        Self {
            config,
            http_client,
            table,
            search,
            uploads,
        }
    }
}
