use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;

const NO_RESULT: &str = "No good Google Search Result was found";
const MAX_ORGANIC: usize = 10;

/// Web search returning a flat text digest of the results.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn run(&self, query: &str) -> Result<String>;
}

/// Google search through serper.dev.
pub struct SerperClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SerperClient {
    pub fn new(client: reqwest::Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
    num: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerperResponse {
    #[serde(default)]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
    #[serde(default)]
    snippet_highlighted: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgeGraph {
    title: Option<String>,
    #[serde(rename = "type")]
    entity_type: Option<String>,
    description: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct OrganicResult {
    snippet: Option<String>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl WebSearch for SerperClient {
    async fn run(&self, query: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .context("SERPER_API_KEY is not set")?;

        let url = format!("{}/search", self.config.base_url);
        let req = SerperRequest {
            q: query,
            gl: "us",
            hl: "en",
            num: MAX_ORGANIC,
        };

        let resp = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&req)
            .send()
            .await
            .context("Failed to call Serper search API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Serper search API returned {status}: {body}");
        }

        let body: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;
        tracing::debug!(
            "Serper returned {} organic results for '{query}'",
            body.organic.len()
        );
        Ok(digest(&body))
    }
}

/// Flatten a search response into one paragraph.
///
/// A direct answer wins outright; otherwise knowledge-graph facts come first,
/// followed by organic snippets.
pub fn digest(results: &SerperResponse) -> String {
    if let Some(answer_box) = &results.answer_box {
        if let Some(answer) = answer_box.answer.as_deref().filter(|a| !a.is_empty()) {
            return answer.to_string();
        }
        if let Some(snippet) = answer_box.snippet.as_deref().filter(|s| !s.is_empty()) {
            return snippet.replace('\n', " ");
        }
        if !answer_box.snippet_highlighted.is_empty() {
            return answer_box.snippet_highlighted.join(" ");
        }
    }

    let mut snippets = Vec::new();

    if let Some(kg) = &results.knowledge_graph {
        let title = kg.title.as_deref().unwrap_or_default();
        if let Some(entity_type) = kg.entity_type.as_deref().filter(|t| !t.is_empty()) {
            snippets.push(format!("{title}: {entity_type}."));
        }
        if let Some(description) = kg.description.as_deref().filter(|d| !d.is_empty()) {
            snippets.push(description.to_string());
        }
        for (attribute, value) in &kg.attributes {
            snippets.push(format!("{title} {attribute}: {}.", display_value(value)));
        }
    }

    for result in results.organic.iter().take(MAX_ORGANIC) {
        if let Some(snippet) = &result.snippet {
            snippets.push(snippet.clone());
        }
        for (attribute, value) in &result.attributes {
            snippets.push(format!("{attribute}: {}.", display_value(value)));
        }
    }

    if snippets.is_empty() {
        return NO_RESULT.to_string();
    }
    snippets.join(" ")
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(json: serde_json::Value) -> SerperResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_answer_box_answer_wins() {
        let results = parse(serde_json::json!({
            "answerBox": {"answer": "42", "snippet": "ignored"},
            "organic": [{"snippet": "also ignored"}]
        }));
        assert_eq!(digest(&results), "42");
    }

    #[test]
    fn test_answer_box_snippet_flattens_newlines() {
        let results = parse(serde_json::json!({
            "answerBox": {"snippet": "line one\nline two"}
        }));
        assert_eq!(digest(&results), "line one line two");
    }

    #[test]
    fn test_knowledge_graph_then_organic() {
        let results = parse(serde_json::json!({
            "knowledgeGraph": {
                "title": "Dhaka",
                "type": "City",
                "description": "Capital of Bangladesh",
                "attributes": {"Population": "10 million"}
            },
            "organic": [
                {"link": "https://a", "snippet": "first"},
                {"link": "https://b", "snippet": "second", "attributes": {"Date": "2024"}}
            ]
        }));
        assert_eq!(
            digest(&results),
            "Dhaka: City. Capital of Bangladesh Dhaka Population: 10 million. first second Date: 2024."
        );
    }

    #[test]
    fn test_empty_results() {
        let results = parse(serde_json::json!({"organic": []}));
        assert_eq!(digest(&results), NO_RESULT);
    }

    #[tokio::test]
    async fn test_run_posts_query_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("x-api-key", "serper-key"))
            .and(body_partial_json(serde_json::json!({"q": "hilsa price"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [{"snippet": "Hilsa prices soared."}]
            })))
            .mount(&server)
            .await;

        let client = SerperClient::new(
            reqwest::Client::new(),
            SearchConfig {
                base_url: server.uri(),
                api_key: Some("serper-key".to_string()),
            },
        );
        assert_eq!(client.run("hilsa price").await.unwrap(), "Hilsa prices soared.");
    }

    #[tokio::test]
    async fn test_run_without_key_fails() {
        let client = SerperClient::new(
            reqwest::Client::new(),
            SearchConfig {
                base_url: "http://localhost:1".to_string(),
                api_key: None,
            },
        );
        let err = client.run("x").await.unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }
}
