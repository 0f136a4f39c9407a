use loan_review::config::ReviewConfig;
use loan_review::workflows::loan_review::{
    CsvApplicationSource, LoanReviewService, LoanReviewer, PromptTemplate,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the CSV source, policy document and optional Ollama backend from configuration.
pub(crate) fn review_service(
    config: &ReviewConfig,
    narrative_enabled: bool,
) -> LoanReviewService<CsvApplicationSource> {
    let source = Arc::new(CsvApplicationSource::from_data_dir(&config.data_dir));
    let reviewer = LoanReviewer::new(config.thresholds.clone());
    let service =
        LoanReviewService::new(source, reviewer).with_policy_path(config.policy_path.clone());

    if narrative_enabled {
        let prompt = PromptTemplate::load(config.prompt_template.as_deref());
        service.with_ollama(config.ollama.clone(), prompt)
    } else {
        service
    }
}
