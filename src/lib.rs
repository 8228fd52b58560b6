//! # meme-ingest
//!
//! An HTTP service that ingests meme images in bulk, extracts their text with
//! a vision-language model, stores files and metadata, and annotates memes
//! through short LLM prompt chains.
//!
//! ## Upload pipeline
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │ POST /upload/memes       │
//!                    │ multipart, ≤ 2500 files  │
//!                    └────────────┬─────────────┘
//!                                 │ dedupe names
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ one task per file        │
//!                    │ ≤ 50 holding a permit    │
//!                    └────────────┬─────────────┘
//!                                 │
//!        ┌────────────────────────┼─────────────────────────┐
//!        ▼                        ▼                         ▼
//!  ┌───────────┐          ┌───────────────┐          ┌─────────────┐
//!  │ validate  │          │  MemeTable    │          │ ObjectStore │
//!  │ name/ext/ │          │ status check, │          │ exists,     │
//!  │ mime/size │          │ row + OCR     │          │ upload      │
//!  └───────────┘          └───────────────┘          └─────────────┘
//!                                 │
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ uploaded | upload_failed │
//!                    │ per-file outcome + tally │
//!                    └──────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, stores, limits and LLM settings
//! - [`models`] - Table rows, patches, per-file outcomes and request/response types
//! - [`storage`] - `MemeTable` / `ObjectStore` interfaces with Supabase and in-memory backends
//! - [`upload`] - Validation, the bounded-concurrency pipeline and the result tally
//! - [`llm`] - OpenAI-compatible and Ollama chat calls, OCR, structured-output parsing
//! - [`search`] - Serper web search and its result digest
//! - [`agents`] - Overview and web-context annotation chains
//! - [`api`] - Axum HTTP handlers and router
//! - [`state`] - Shared application state wiring the services together

pub mod agents;
pub mod api;
pub mod config;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
pub mod storage;
pub mod upload;
