//! Feedback analysis: column inference, enrichment and aggregation.
//!
//! - [`column`] picks the column that holds the feedback text.
//! - [`engine`] classifies rows through an [`AIProvider`](crate::ai::AIProvider)
//!   and produces category insights.
//! - [`aggregate`] holds the [`AccumulatedResult`] and its merge rules.
//! - [`chunking`] splits a dataset into contiguous chunks for progress.

pub mod aggregate;
pub mod chunking;
pub mod column;
pub mod engine;

pub use aggregate::AccumulatedResult;
pub use chunking::ChunkPlan;
pub use column::{FeedbackColumn, SelectionReason, infer_feedback_column};
pub use engine::{analyze_in_chunks, enrich_and_aggregate, generate_insights};
