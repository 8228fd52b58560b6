use anyhow::Result;
use async_trait::async_trait;

use super::chat::{complete, ImageSource, Prompt};
use crate::config::LlmConfig;

const OCR_INSTRUCTION: &str = "Please extract all text from this image. If the text is in \
     Bengali, preserve the Bengali characters. Return only the extracted text without any \
     additional commentary.";

/// Reads the text printed on an image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &[u8], mime: &str) -> Result<String>;
}

/// OCR backed by the configured vision model.
pub struct LlmTextExtractor {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmTextExtractor {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextExtractor for LlmTextExtractor {
    async fn extract_text(&self, image: &[u8], mime: &str) -> Result<String> {
        extract_ocr_text(&self.client, &self.config, image, mime).await
    }
}

pub async fn extract_ocr_text(
    client: &reqwest::Client,
    config: &LlmConfig,
    image: &[u8],
    mime: &str,
) -> Result<String> {
    let prompt = Prompt::new(OCR_INSTRUCTION).image(ImageSource::Inline {
        mime: mime.to_string(),
        data: image.to_vec(),
    });
    let text = complete(client, config, &config.vision_model, prompt).await?;
    Ok(text.trim().to_string())
}
