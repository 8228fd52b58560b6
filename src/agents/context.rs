use anyhow::Result;
use serde::Deserialize;

use crate::config::LlmConfig;
use crate::llm::chat::{complete, ImageSource, Prompt};
use crate::llm::structured::parse_json_object;
use crate::search::serper::WebSearch;

const KEYWORD_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Deserialize)]
struct SearchKeyword {
    search_keyword: String,
}

#[derive(Debug, Deserialize)]
struct BengaliTranslation {
    translated_to_bengali: String,
}

/// Find real-world background for the meme at `image_url`, in Bengali.
///
/// Returns `Ok(None)` when no usable search keyword came back. If the
/// translation is malformed the untranslated search digest is returned.
pub async fn context_search(
    client: &reqwest::Client,
    config: &LlmConfig,
    search: &dyn WebSearch,
    image_url: &str,
) -> Result<Option<String>> {
    let Some(keyword) = search_keyword(client, config, image_url).await? else {
        tracing::warn!("No search keyword produced for {image_url}");
        return Ok(None);
    };
    tracing::info!("Searching web context for {image_url}: '{keyword}'");

    let search_result = search.run(&keyword).await?;

    match translate_to_bengali(client, config, &search_result).await? {
        Some(translated) => Ok(Some(translated)),
        None => {
            tracing::warn!("Translation unusable, keeping search digest as context");
            Ok(Some(search_result))
        }
    }
}

async fn search_keyword(
    client: &reqwest::Client,
    config: &LlmConfig,
    image_url: &str,
) -> Result<Option<String>> {
    let prompt = Prompt::new(
        "What is a good search keyword or phrase that describes the real-world topic this \
         meme is referencing? Respond with ONLY a JSON object: {\"search_keyword\": \"...\"}",
    )
    .system(
        "You analyze meme images to identify the real-world topic or event they reference. \
         Do not describe the meme or its template. Produce search keywords that would help \
         someone learn about the subject the meme is about: historical events, political \
         topics, cultural references and the like.",
    )
    .image(ImageSource::Url(image_url.to_string()))
    .temperature(KEYWORD_TEMPERATURE)
    .json();

    let response = complete(client, config, &config.vision_model, prompt).await?;
    Ok(parse_json_object::<SearchKeyword>(&response)
        .map(|k| k.search_keyword.trim().to_string())
        .filter(|k| !k.is_empty()))
}

async fn translate_to_bengali(
    client: &reqwest::Client,
    config: &LlmConfig,
    snippet: &str,
) -> Result<Option<String>> {
    let prompt = Prompt::new("Translate this snippet into Bengali:")
        .text(snippet)
        .text("Respond with ONLY a JSON object: {\"translated_to_bengali\": \"...\"}")
        .system(
            "You are a translation assistant. Translate the provided snippet into Bengali, \
             preserving the original meaning.",
        )
        .json();

    let response = complete(client, config, &config.translation_model, prompt).await?;
    Ok(parse_json_object::<BengaliTranslation>(&response)
        .map(|t| t.translated_to_bengali)
        .filter(|t| !t.trim().is_empty()))
}
