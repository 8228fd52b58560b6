use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Which storage backend to wire up
    pub backend: Backend,
    /// Supabase project settings (required for the supabase backend)
    pub supabase: SupabaseConfig,
    /// Upload pipeline limits
    pub upload: UploadConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Web search configuration
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Supabase,
    /// In-process table and object store, nothing leaves the process.
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Metadata table name
    pub table: String,
    /// Storage bucket holding the image files
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of files accepted in a single request
    pub max_files_per_batch: usize,
    /// Maximum size of a single file in bytes
    pub max_file_size: usize,
    /// Number of files processed concurrently
    pub max_concurrent_uploads: usize,
    /// Cap on the whole multipart body in MB
    pub max_body_mb: usize,
    /// Cache-Control max-age (seconds) sent with stored objects
    pub cache_control: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible API, OpenRouter included) or "ollama"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Vision model used for OCR, overview and keyword extraction
    pub vision_model: String,
    /// Model used to translate search snippets
    pub translation_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            backend: Backend::Supabase,
            supabase: SupabaseConfig {
                url: None,
                anon_key: None,
                table: "annotated_memes".to_string(),
                bucket: "memes".to_string(),
            },
            upload: UploadConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files_per_batch: 2500,
            max_file_size: 10 * 1024 * 1024,
            max_concurrent_uploads: 50,
            max_body_mb: 1024,
            cache_control: "3600".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            vision_model: "google/gemini-2.0-flash-001".to_string(),
            translation_model: "google/gemini-2.0-flash-001".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://google.serper.dev".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MEME_INGEST_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(backend) = std::env::var("MEME_INGEST_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "memory" => config.backend = Backend::Memory,
                "supabase" => config.backend = Backend::Supabase,
                other => tracing::warn!("Unknown backend '{other}', using supabase"),
            }
        }

        // Supabase
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            config.supabase.url = Some(url.trim_end_matches('/').to_string());
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            config.supabase.anon_key = Some(key);
        }
        if let Ok(table) = std::env::var("MEME_INGEST_TABLE") {
            config.supabase.table = table;
        }
        if let Ok(bucket) = std::env::var("MEME_INGEST_BUCKET") {
            config.supabase.bucket = bucket;
        }

        // Upload limits
        if let Some(v) = parse_env("MEME_INGEST_MAX_FILES") {
            config.upload.max_files_per_batch = v;
        }
        if let Some(v) = parse_env("MEME_INGEST_MAX_FILE_SIZE") {
            config.upload.max_file_size = v;
        }
        if let Some(v) = parse_env::<usize>("MEME_INGEST_MAX_CONCURRENT_UPLOADS") {
            config.upload.max_concurrent_uploads = v.max(1);
        }
        if let Some(v) = parse_env("MEME_INGEST_MAX_BODY_MB") {
            config.upload.max_body_mb = v;
        }
        if let Ok(cc) = std::env::var("MEME_INGEST_CACHE_CONTROL") {
            config.upload.cache_control = cc;
        }

        // LLM; OpenRouter names win over the generic ones
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(url) = first_env(&["OPENROUTER_BASE_URL", "LLM_BASE_URL"]) {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = first_env(&["OPENROUTER_API_KEY", "LLM_API_KEY"]) {
            config.llm.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LLM_VISION_MODEL") {
            config.llm.vision_model = model;
        }
        if let Ok(model) = std::env::var("LLM_TRANSLATION_MODEL") {
            config.llm.translation_model = model;
        }
        if let Some(v) = parse_env("LLM_TIMEOUT_SECS") {
            config.llm.timeout_secs = v;
        }

        // Web search
        if let Ok(url) = std::env::var("SERPER_BASE_URL") {
            config.search.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var("SERPER_API_KEY") {
            config.search.api_key = Some(key);
        }

        config
    }

    pub fn max_body_bytes(&self) -> usize {
        self.upload.max_body_mb.saturating_mul(1024 * 1024)
    }
}

impl SupabaseConfig {
    /// Returns `(url, key)`, naming whichever variable is missing.
    pub fn credentials(&self) -> anyhow::Result<(&str, &str)> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL is not set in environment variables"))?;
        let key = self
            .anon_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("SUPABASE_ANON_KEY is not set in environment variables")
            })?;
        Ok((url, key))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok().filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upload_limits() {
        let config = Config::default();
        assert_eq!(config.upload.max_files_per_batch, 2500);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.upload.max_concurrent_uploads, 50);
        assert_eq!(config.supabase.table, "annotated_memes");
        assert_eq!(config.supabase.bucket, "memes");
    }

    #[test]
    fn test_credentials_missing_url_is_named() {
        let supabase = SupabaseConfig {
            anon_key: Some("key".to_string()),
            ..Default::default()
        };
        let err = supabase.credentials().unwrap_err().to_string();
        assert!(err.contains("SUPABASE_URL"));
    }

    #[test]
    fn test_credentials_missing_key_is_named() {
        let supabase = SupabaseConfig {
            url: Some("https://x.supabase.co".to_string()),
            ..Default::default()
        };
        let err = supabase.credentials().unwrap_err().to_string();
        assert!(err.contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn test_credentials_present() {
        let supabase = SupabaseConfig {
            url: Some("https://x.supabase.co".to_string()),
            anon_key: Some("key".to_string()),
            ..Default::default()
        };
        let (url, key) = supabase.credentials().unwrap();
        assert_eq!(url, "https://x.supabase.co");
        assert_eq!(key, "key");
    }
}
