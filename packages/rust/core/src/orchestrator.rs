//! Per-product run: collect → analyze → build.
//!
//! One call to [`process_product`] is one run with its own store. A failing
//! source or analysis is logged, recorded in the outcome and left out of the
//! store. Only an empty registry aborts before collection starts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use seocontext_shared::{Product, ProductContext, Result, RunId, SeoContextError, SourceId};
use seocontext_sources::{ConnectorRegistry, fetch_payload};

use crate::analysis::{Analysis, default_analyses};
use crate::context::build_context;
use crate::store::{RunResultStore, StageOutput};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Collecting,
    Analyzing,
    Building,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Analyzing => "analyzing",
            Self::Building => "building",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only run lifecycle. No state is entered twice.
#[derive(Debug)]
pub struct RunStateMachine {
    state: RunState,
    history: Vec<RunState>,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// States visited so far, starting with `idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn advance(&mut self, to: RunState) -> Result<()> {
        use RunState::*;
        let allowed = matches!(
            (self.state, to),
            (Idle, Collecting)
                | (Collecting, Analyzing)
                | (Collecting, Failed)
                | (Analyzing, Building)
                | (Analyzing, Failed)
                | (Building, Done)
        );
        if !allowed {
            return Err(SeoContextError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Progress and outcome
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when the run enters a new state.
    fn phase(&self, state: RunState);
    /// Called as each source finishes, in completion order.
    fn source_finished(&self, source: SourceId, ok: bool, current: usize, total: usize);
    /// Called once the run ends, whether done or failed.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _state: RunState) {}
    fn source_finished(&self, _source: SourceId, _ok: bool, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

/// A source or analysis that was left out of the store.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub error: String,
}

/// Conditions worth surfacing to the caller that did not fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    /// No source produced a usable keyword signal.
    NoKeywordOpportunity,
    /// The merchant feed reports at least one critical product issue.
    CriticalDataQualityIssues,
}

impl Diagnostic {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoKeywordOpportunity => "no keyword opportunity found in any source",
            Self::CriticalDataQualityIssues => "merchant feed reports critical product issues",
        }
    }
}

/// Result of one product run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub product_key: String,
    pub state: RunState,
    /// Present when the run reached `done`.
    pub context: Option<ProductContext>,
    /// Populated store keys, in insertion order.
    pub stages: Vec<String>,
    /// Sources and analyses that answered but had no data.
    pub empty_stages: Vec<String>,
    pub failures: Vec<StageFailure>,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the full pipeline for one product with the built-in analyses.
pub async fn process_product(
    registry: &ConnectorRegistry,
    product: &Product,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    process_product_with(registry, &default_analyses(), product, progress).await
}

/// Run the pipeline with a caller-supplied analysis list.
#[instrument(skip_all, fields(product = %product.key()))]
pub async fn process_product_with(
    registry: &ConnectorRegistry,
    analyses: &[Box<dyn Analysis>],
    product: &Product,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    let started = Instant::now();
    product.validate()?;
    if registry.is_empty() {
        return Err(SeoContextError::fatal("no data sources configured"));
    }

    let run_id = RunId::new();
    let product_key = product.key();
    let mut machine = RunStateMachine::new();
    let mut store = RunResultStore::new();
    let mut failures: Vec<StageFailure> = Vec::new();
    let mut empty_stages: Vec<String> = Vec::new();

    info!(%run_id, product = %product_key, sources = registry.len(), "starting run");

    // --- collecting ---
    machine.advance(RunState::Collecting)?;
    progress.phase(RunState::Collecting);

    let total = registry.len();
    let finished = AtomicUsize::new(0);
    let timeout = registry.timeout();
    let fetches = registry.iter().map(|connector| {
        let finished = &finished;
        async move {
            let result = fetch_payload(connector, product, timeout).await;
            let current = finished.fetch_add(1, Ordering::Relaxed) + 1;
            progress.source_finished(connector.id(), result.is_ok(), current, total);
            (connector.id(), result)
        }
    });

    // Joined before any write, so the store is written in registry order.
    for (id, result) in join_all(fetches).await {
        match result {
            Ok(payload) => store.insert(StageOutput::Source(payload))?,
            Err(SeoContextError::EmptyResult { .. }) => {
                info!(source = %id, "source returned no data");
                empty_stages.push(id.as_str().to_string());
            }
            Err(e) => {
                warn!(source = %id, error = %e, "source failed, continuing without it");
                failures.push(StageFailure {
                    stage: id.as_str().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    // Empty sources still reach `building`; only unavailable or malformed ones fail the run.
    if store.is_empty() && empty_stages.is_empty() {
        warn!(%run_id, "every source failed");
        return finish(
            run_id,
            product_key,
            machine,
            store,
            StageReport { empty_stages, failures, diagnostics: Vec::new() },
            None,
            started,
            progress,
        );
    }

    // --- analyzing ---
    machine.advance(RunState::Analyzing)?;
    progress.phase(RunState::Analyzing);

    let mut answered = 0usize;
    for analysis in analyses {
        let key = analysis.key();
        match analysis.run(product, &store).await {
            Ok(output) => {
                store.insert(output)?;
                answered += 1;
            }
            Err(SeoContextError::EmptyResult { .. }) => {
                info!(analysis = %key, "analysis had no input data");
                empty_stages.push(key.as_str().to_string());
                answered += 1;
            }
            Err(e) => {
                warn!(analysis = %key, error = %e, "analysis failed, continuing without it");
                failures.push(StageFailure {
                    stage: key.as_str().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    if answered == 0 && !analyses.is_empty() {
        warn!(%run_id, "every analysis failed");
        return finish(
            run_id,
            product_key,
            machine,
            store,
            StageReport { empty_stages, failures, diagnostics: Vec::new() },
            None,
            started,
            progress,
        );
    }

    let mut diagnostics = Vec::new();
    if store.keyword_analysis().is_none_or(|k| k.is_empty()) {
        warn!(%run_id, "no keyword opportunity found");
        diagnostics.push(Diagnostic::NoKeywordOpportunity);
    }
    if store.merchant().is_some_and(|m| m.has_critical_issues()) {
        diagnostics.push(Diagnostic::CriticalDataQualityIssues);
    }

    // --- building ---
    machine.advance(RunState::Building)?;
    progress.phase(RunState::Building);
    let context = build_context(product, &store);

    finish(
        run_id,
        product_key,
        machine,
        store,
        StageReport { empty_stages, failures, diagnostics },
        Some(context),
        started,
        progress,
    )
}

/// What happened to the stages that did not land in the store.
struct StageReport {
    empty_stages: Vec<String>,
    failures: Vec<StageFailure>,
    diagnostics: Vec<Diagnostic>,
}

/// Move to the terminal state and report. A context means the run is done.
#[allow(clippy::too_many_arguments)]
fn finish(
    run_id: RunId,
    product_key: String,
    mut machine: RunStateMachine,
    store: RunResultStore,
    report: StageReport,
    context: Option<ProductContext>,
    started: Instant,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    let terminal = if context.is_some() {
        RunState::Done
    } else {
        RunState::Failed
    };
    machine.advance(terminal)?;
    progress.phase(terminal);

    let outcome = RunOutcome {
        run_id,
        product_key,
        state: machine.state(),
        context,
        stages: store.keys().into_iter().map(String::from).collect(),
        empty_stages: report.empty_stages,
        failures: report.failures,
        diagnostics: report.diagnostics,
        elapsed: started.elapsed(),
    };

    info!(
        run_id = %outcome.run_id,
        state = %outcome.state,
        stages = outcome.stages.len(),
        empty = outcome.empty_stages.len(),
        failures = outcome.failures.len(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "run finished"
    );
    progress.done(&outcome);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seocontext_sources::StaticConnector;
    use serde_json::json;

    use crate::store::StageKey;

    fn product() -> Product {
        serde_json::from_value(json!({"ean": "9312432031183", "brand": "Sage", "title": "Slow Cooker"}))
            .expect("valid product")
    }

    fn registry(sources: Vec<(SourceId, serde_json::Value)>) -> ConnectorRegistry {
        let mut registry = ConnectorRegistry::new();
        for (id, payload) in sources {
            registry
                .register(Box::new(StaticConnector::new(id, payload)))
                .expect("register");
        }
        registry
    }

    struct Failing;

    #[async_trait]
    impl Analysis for Failing {
        fn key(&self) -> StageKey {
            StageKey::KeywordAnalysis
        }

        async fn run(&self, _product: &Product, _store: &RunResultStore) -> Result<StageOutput> {
            Err(SeoContextError::validation("boom"))
        }
    }

    #[test]
    fn state_machine_only_moves_forward() {
        let mut machine = RunStateMachine::new();
        machine.advance(RunState::Collecting).expect("idle -> collecting");
        machine.advance(RunState::Analyzing).expect("collecting -> analyzing");

        let err = machine.advance(RunState::Collecting).unwrap_err();
        assert!(matches!(err, SeoContextError::InvalidTransition { .. }));

        machine.advance(RunState::Building).expect("analyzing -> building");
        assert!(machine.advance(RunState::Failed).is_err());
        machine.advance(RunState::Done).expect("building -> done");
        assert!(machine.state().is_terminal());
        assert_eq!(machine.history().len(), 5);
    }

    #[test]
    fn idle_cannot_skip_to_building() {
        let mut machine = RunStateMachine::new();
        assert!(machine.advance(RunState::Building).is_err());
        assert_eq!(machine.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn empty_registry_is_fatal() {
        let err = process_product(&ConnectorRegistry::new(), &product(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SeoContextError::FatalConfiguration { .. }));
    }

    #[tokio::test]
    async fn all_sources_failing_ends_in_failed() {
        let registry = registry(vec![
            (SourceId::Analytics, json!({"error": "credentials missing"})),
            (SourceId::TrendService, json!({"error": "rate limited"})),
        ]);
        let outcome = process_product(&registry, &product(), &SilentProgress)
            .await
            .expect("run completes");

        assert_eq!(outcome.state, RunState::Failed);
        assert!(outcome.context.is_none());
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.stages.is_empty());
    }

    #[tokio::test]
    async fn empty_sources_still_build_a_context() {
        let registry = registry(vec![
            (SourceId::Analytics, json!({})),
            (SourceId::SearchConsole, json!({})),
            (SourceId::TrendService, json!({})),
        ]);
        let outcome = process_product(&registry, &product(), &SilentProgress)
            .await
            .expect("run completes");

        assert!(outcome.is_done());
        assert!(outcome.failures.is_empty());
        assert_eq!(
            outcome.empty_stages,
            vec![
                "analytics",
                "search_console",
                "trend_service",
                "competitor_analysis",
                "price_intelligence",
            ]
        );
        assert_eq!(outcome.diagnostics, vec![Diagnostic::NoKeywordOpportunity]);

        let seo = outcome.context.expect("context").seo_context;
        assert!(seo.high_value_keywords.is_empty());
        assert_eq!(seo.sources_used, vec!["keyword_analysis", "content_optimization"]);
    }

    #[tokio::test]
    async fn empty_and_unavailable_sources_are_reported_apart() {
        let registry = registry(vec![
            (SourceId::Analytics, json!({"error": "credentials missing"})),
            (SourceId::TrendService, json!({})),
        ]);
        let outcome = process_product(&registry, &product(), &SilentProgress)
            .await
            .expect("run completes");

        assert!(outcome.is_done());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].stage, "analytics");
        assert_eq!(outcome.empty_stages[0], "trend_service");
    }

    #[tokio::test]
    async fn all_analyses_failing_ends_in_failed() {
        let registry = registry(vec![(
            SourceId::Analytics,
            json!({"brand_keywords": {"keywords": [{"term": "sage cooker", "sessions": 10}]}}),
        )]);
        let analyses: Vec<Box<dyn Analysis>> = vec![Box::new(Failing)];
        let outcome = process_product_with(&registry, &analyses, &product(), &SilentProgress)
            .await
            .expect("run completes");

        assert_eq!(outcome.state, RunState::Failed);
        assert_eq!(outcome.stages, vec!["analytics".to_string()]);
        assert_eq!(outcome.failures[0].stage, "keyword_analysis");
    }

    #[tokio::test]
    async fn sources_without_keywords_report_diagnostic() {
        let registry = registry(vec![(
            SourceId::MerchantCenter,
            json!({"product_issues": {"issues": [{"code": "missing_gtin", "severity": "critical", "description": "GTIN missing"}]}}),
        )]);
        let outcome = process_product(&registry, &product(), &SilentProgress)
            .await
            .expect("run completes");

        assert!(outcome.is_done());
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::NoKeywordOpportunity, Diagnostic::CriticalDataQualityIssues]
        );
        let context = outcome.context.expect("context");
        assert!(context.seo_context.high_value_keywords.is_empty());
        assert_eq!(context.seo_context.data_quality_issues.len(), 1);
    }
}
