//! Annotation workflows. Each one is a short, linear chain of model calls.
//!
//! - [`overview`]: one vision call producing a [`MemeOverview`](crate::models::MemeOverview).
//! - [`context`]: vision call for a search keyword, a web search, then a
//!   translation of the search digest into Bengali.

pub mod context;
pub mod overview;
