use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Serialize;

use super::{MemeTable, ObjectStore};
use crate::models::{AnnotationStatus, MemePatch, MemeRecord};

/// Connection details shared by the table and storage clients.
#[derive(Debug, Clone)]
pub struct SupabaseProject {
    pub url: String,
    pub api_key: String,
}

impl SupabaseProject {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

// ─── PostgREST table ─────────────────────────────────────

/// Metadata table accessed through PostgREST (`/rest/v1/{table}`).
pub struct SupabaseTable {
    client: reqwest::Client,
    project: SupabaseProject,
    table: String,
}

/// Columns written when a row is first created.
#[derive(Serialize)]
struct InsertRow<'a> {
    image_id: &'a str,
    file_name: &'a str,
    annotation_status: Option<AnnotationStatus>,
    uploaded_meme_url: Option<&'a str>,
    err_msg: Option<&'a str>,
    ocr_text: Option<&'a str>,
}

impl SupabaseTable {
    pub fn new(client: reqwest::Client, project: SupabaseProject, table: &str) -> Self {
        Self {
            client,
            project,
            table: table.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.project.url, self.table)
    }

    async fn patch_where(&self, column: &str, value: &str, patch: &MemePatch) -> Result<usize> {
        let resp = self
            .project
            .authorize(self.client.patch(self.endpoint()))
            .query(&[(column, format!("eq.{value}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .with_context(|| format!("Failed to update {} where {column}={value}", self.table))?;

        let rows: Vec<serde_json::Value> = check(resp, "update")
            .await?
            .json()
            .await
            .context("Failed to parse update response")?;
        Ok(rows.len())
    }
}

#[async_trait]
impl MemeTable for SupabaseTable {
    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<MemeRecord>> {
        let resp = self
            .project
            .authorize(self.client.get(self.endpoint()))
            .query(&[
                ("select", "*".to_string()),
                ("file_name", format!("eq.{file_name}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to query {} for '{file_name}'", self.table))?;

        let rows: Vec<MemeRecord> = check(resp, "select")
            .await?
            .json()
            .await
            .context("Failed to parse select response")?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: &MemeRecord) -> Result<()> {
        let row = InsertRow {
            image_id: &record.image_id,
            file_name: &record.file_name,
            annotation_status: record.annotation_status,
            uploaded_meme_url: record.uploaded_meme_url.as_deref(),
            err_msg: record.err_msg.as_deref(),
            ocr_text: record.ocr_text.as_deref(),
        };

        let resp = self
            .project
            .authorize(self.client.post(self.endpoint()))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .with_context(|| format!("Failed to insert into {}", self.table))?;

        check(resp, "insert").await?;
        Ok(())
    }

    async fn update_by_image_id(&self, image_id: &str, patch: &MemePatch) -> Result<usize> {
        self.patch_where("image_id", image_id, patch).await
    }

    async fn update_by_id(&self, id: &str, patch: &MemePatch) -> Result<usize> {
        self.patch_where("id", id, patch).await
    }

    async fn ping(&self) -> Result<()> {
        let resp = self
            .project
            .authorize(self.client.get(self.endpoint()))
            .query(&[("select", "image_id"), ("limit", "1")])
            .send()
            .await
            .context("Failed to reach database")?;
        check(resp, "ping").await?;
        Ok(())
    }
}

// ─── Storage bucket ──────────────────────────────────────

/// Image bucket accessed through the Supabase storage API.
pub struct SupabaseStorage {
    client: reqwest::Client,
    project: SupabaseProject,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: reqwest::Client, project: SupabaseProject, bucket: &str) -> Self {
        Self {
            client,
            project,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn exists(&self, key: &str) -> Result<bool> {
        let url = format!(
            "{}/storage/v1/object/info/{}/{key}",
            self.project.url, self.bucket
        );
        let resp = self
            .project
            .authorize(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Failed to look up object {key}"))?;

        // Storage answers 400 for a missing object on some versions, 404 on others
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            _ => {
                check(resp, "object info").await?;
                Ok(false)
            }
        }
    }

    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}/{key}", self.project.url, self.bucket);
        let resp = self
            .project
            .authorize(self.client.post(&url))
            .header("Content-Type", content_type)
            .header("Cache-Control", format!("max-age={cache_control}"))
            .header("x-upsert", "false")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload object {key}"))?;

        check(resp, "upload").await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.project.url, self.bucket
        )
    }
}

async fn check(resp: reqwest::Response, op: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    anyhow::bail!("Supabase {op} returned {status}: {body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project(server: &MockServer) -> SupabaseProject {
        SupabaseProject::new(&server.uri(), "anon-key")
    }

    #[tokio::test]
    async fn test_find_by_file_name_filters_on_column() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/annotated_memes"))
            .and(query_param("file_name", "eq.cat.png"))
            .and(header("apikey", "anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 7, "image_id": "img-1", "file_name": "cat.png", "annotation_status": "uploaded"}
            ])))
            .mount(&server)
            .await;

        let table = SupabaseTable::new(reqwest::Client::new(), project(&server), "annotated_memes");
        let record = table.find_by_file_name("cat.png").await.unwrap().unwrap();
        assert_eq!(record.image_id, "img-1");
        assert_eq!(record.annotation_status, Some(AnnotationStatus::Uploaded));
    }

    #[tokio::test]
    async fn test_find_by_file_name_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/annotated_memes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let table = SupabaseTable::new(reqwest::Client::new(), project(&server), "annotated_memes");
        assert!(table.find_by_file_name("none.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_counts_returned_rows() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/annotated_memes"))
            .and(query_param("image_id", "eq.img-1"))
            .and(body_json(serde_json::json!({
                "annotation_status": "uploading",
                "uploaded_meme_url": null,
                "err_msg": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"image_id": "img-1", "file_name": "cat.png"}
            ])))
            .mount(&server)
            .await;

        let table = SupabaseTable::new(reqwest::Client::new(), project(&server), "annotated_memes");
        let rows = table
            .update_by_image_id("img-1", &MemePatch::uploading())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_update_by_id_filters_on_primary_key() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/annotated_memes"))
            .and(query_param("id", "eq.7"))
            .and(body_json(serde_json::json!({
                "annotation_status": "fully_annotated",
                "context": "ctx"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let table = SupabaseTable::new(reqwest::Client::new(), project(&server), "annotated_memes");
        let rows = table
            .update_by_id("7", &MemePatch::context("ctx"))
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_select_error_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let table = SupabaseTable::new(reqwest::Client::new(), project(&server), "annotated_memes");
        let err = table.find_by_file_name("cat.png").await.unwrap_err();
        assert!(format!("{err:#}").contains("db down"));
    }

    #[tokio::test]
    async fn test_object_exists_maps_missing_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/info/memes/present"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/info/memes/absent"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(reqwest::Client::new(), project(&server), "memes");
        assert!(storage.exists("present").await.unwrap());
        assert!(!storage.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_sends_content_type_and_cache_control() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/memes/img-1"))
            .and(header("content-type", "image/png"))
            .and(header("cache-control", "max-age=3600"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"Key": "memes/img-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(reqwest::Client::new(), project(&server), "memes");
        storage
            .upload("img-1", Bytes::from_static(b"\x89PNG"), "image/png", "3600")
            .await
            .unwrap();
    }

    #[test]
    fn test_public_url_layout() {
        let storage = SupabaseStorage::new(
            reqwest::Client::new(),
            SupabaseProject::new("https://abc.supabase.co/", "k"),
            "memes",
        );
        assert_eq!(
            storage.public_url("img-1"),
            "https://abc.supabase.co/storage/v1/object/public/memes/img-1"
        );
    }
}
