//! Bulk meme upload.
//!
//! ```text
//!   files ──► dedupe names ──► one task per file (semaphore-bounded)
//!                                   │
//!                 validate ─► status check ─► row (OCR on insert)
//!                                   │
//!                          upload object ─► mark uploaded
//!                                   │ on error after the row exists
//!                                   └────► mark upload_failed
//! ```

pub mod pipeline;
pub mod report;
pub mod validate;
