use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Image attached to a prompt.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw bytes, sent inline
    Inline { mime: String, data: Vec<u8> },
    /// Publicly reachable URL
    Url(String),
}

impl ImageSource {
    /// `data:{mime};base64,...` form accepted by OpenAI-compatible APIs.
    pub fn data_url(mime: &str, data: &[u8]) -> String {
        format!("data:{mime};base64,{}", BASE64.encode(data))
    }
}

/// A single-turn prompt: optional system message, user text parts, optional image.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub system: Option<String>,
    pub text: Vec<String>,
    pub image: Option<ImageSource>,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response
    pub json: bool,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: vec![text.into()],
            ..Default::default()
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text.push(text.into());
        self
    }

    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(image);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// Run a prompt against `model` and return the assistant's text.
pub async fn complete(
    client: &reqwest::Client,
    config: &LlmConfig,
    model: &str,
    prompt: Prompt,
) -> Result<String> {
    match config.provider.as_str() {
        "openai" => call_openai(client, config, model, prompt).await,
        "ollama" => call_ollama(client, config, model, prompt).await,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_openai_request(model: &str, prompt: Prompt) -> OpenAiChatRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system {
        messages.push(OpenAiMessage {
            role: "system",
            content: OpenAiContent::Text(system),
        });
    }

    let mut parts: Vec<ContentPart> = prompt
        .text
        .into_iter()
        .map(|text| ContentPart::Text { text })
        .collect();
    if let Some(image) = prompt.image {
        let url = match image {
            ImageSource::Inline { mime, data } => ImageSource::data_url(&mime, &data),
            ImageSource::Url(url) => url,
        };
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        });
    }
    messages.push(OpenAiMessage {
        role: "user",
        content: OpenAiContent::Parts(parts),
    });

    OpenAiChatRequest {
        model: model.to_string(),
        messages,
        temperature: prompt.temperature,
        response_format: prompt
            .json
            .then(|| serde_json::json!({ "type": "json_object" })),
    }
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    model: &str,
    prompt: Prompt,
) -> Result<String> {
    let url = format!("{}/chat/completions", config.base_url);
    let req = build_openai_request(model, prompt);

    let mut builder = client.post(&url).json(&req);
    if let Some(key) = config.api_key.as_deref() {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }

    let resp = builder
        .send()
        .await
        .context("Failed to call OpenAI-compatible chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .context("Failed to parse chat completion response")?;
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Chat completion returned no content")
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    model: &str,
    prompt: Prompt,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);

    // Ollama only takes inline base64 images
    let images = match prompt.image {
        Some(ImageSource::Inline { data, .. }) => vec![BASE64.encode(data)],
        Some(ImageSource::Url(image_url)) => {
            let bytes = fetch_image(client, &image_url).await?;
            vec![BASE64.encode(bytes)]
        }
        None => Vec::new(),
    };

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system {
        messages.push(OllamaMessage {
            role: "system".to_string(),
            content: system,
            images: Vec::new(),
        });
    }
    messages.push(OllamaMessage {
        role: "user".to_string(),
        content: prompt.text.join("\n\n"),
        images,
    });

    let req = OllamaChatRequest {
        model: model.to_string(),
        messages,
        stream: false,
        format: prompt.json.then_some("json"),
        options: prompt.temperature.map(|temperature| OllamaOptions { temperature }),
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await?;
    Ok(body.message.content)
}

async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<bytes::Bytes> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch image {url}"))?;
    if !resp.status().is_success() {
        anyhow::bail!("Fetching image {url} returned {}", resp.status());
    }
    Ok(resp.bytes().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(provider: &str, base_url: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            base_url: base_url.to_string(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(
            ImageSource::data_url("image/png", b"abc"),
            "data:image/png;base64,YWJj"
        );
    }

    #[test]
    fn test_openai_request_shape() {
        let prompt = Prompt::new("describe")
            .system("sys")
            .image(ImageSource::Url("https://x/y.png".to_string()))
            .temperature(0.2)
            .json();
        let json = serde_json::to_value(build_openai_request("m", prompt)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["content"][0]["type"], "text");
        assert_eq!(json["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][1]["content"][1]["image_url"]["url"],
            "https://x/y.png"
        );
        assert_eq!(json["response_format"]["type"], "json_object");
        let t = json["temperature"].as_f64().unwrap();
        assert!((t - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_openai_request_omits_unset_options() {
        let json = serde_json::to_value(build_openai_request("m", Prompt::new("hi"))).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_openai() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "vision"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let out = complete(
            &reqwest::Client::new(),
            &config("openai", &server.uri()),
            "vision",
            Prompt::new("hi"),
        )
        .await
        .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_complete_openai_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = complete(
            &reqwest::Client::new(),
            &config("openai", &server.uri()),
            "vision",
            Prompt::new("hi"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_complete_ollama_inlines_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "stream": false,
                "messages": [{"role": "user", "images": ["YWJj"]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "text"}
            })))
            .mount(&server)
            .await;

        let prompt = Prompt::new("read").image(ImageSource::Inline {
            mime: "image/png".to_string(),
            data: b"abc".to_vec(),
        });
        let out = complete(
            &reqwest::Client::new(),
            &config("ollama", &server.uri()),
            "llava",
            prompt,
        )
        .await
        .unwrap();
        assert_eq!(out, "text");
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let err = complete(
            &reqwest::Client::new(),
            &config("carrier-pigeon", "http://localhost"),
            "m",
            Prompt::new("hi"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
