//! Signal pipeline for product SEO context.
//!
//! This crate takes the payloads collected by `seocontext-sources` through
//! aggregation, ranking, intent classification and the analysis stage, and
//! assembles the final [`ProductContext`](seocontext_shared::ProductContext).
//! [`orchestrator::process_product`] runs all of it for one product.

pub mod aggregate;
pub mod analysis;
pub mod context;
pub mod extract;
pub mod intent;
pub mod orchestrator;
pub mod ranking;
pub mod store;

pub use aggregate::aggregate;
pub use analysis::{Analysis, analyze_keywords, default_analyses};
pub use context::build_context;
pub use intent::{IntentGroups, classify};
pub use orchestrator::{
    Diagnostic, ProgressReporter, RunOutcome, RunState, RunStateMachine, SilentProgress,
    StageFailure, process_product, process_product_with,
};
pub use ranking::{TOP_KEYWORDS, rank, score};
pub use store::{RunResultStore, StageKey, StageOutput};
