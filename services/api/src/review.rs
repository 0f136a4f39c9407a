use crate::infra::review_service;
use clap::Args;
use loan_review::config::AppConfig;
use loan_review::error::AppError;
use loan_review::telemetry;
use loan_review::workflows::loan_review::ReviewQuery;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Identifier of the application to review
    pub(crate) application_id: String,
    /// Rank policy sections against the findings and cite them
    #[arg(long)]
    pub(crate) use_retrieval: bool,
    /// Ollama model used for this review instead of the configured one
    #[arg(long)]
    pub(crate) model: Option<String>,
    /// Skip the narrative backend and explain with the template
    #[arg(long)]
    pub(crate) no_narrative: bool,
}

pub(crate) async fn run_review(args: ReviewArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let narrative_enabled = config.review.narrative_enabled && !args.no_narrative;
    let service = review_service(&config.review, narrative_enabled);
    let query = ReviewQuery {
        model: args.model,
        use_retrieval: args.use_retrieval,
    };

    info!(application_id = %args.application_id, narrative_enabled, "reviewing application");

    // The Ollama client blocks, so the review runs off the async workers.
    let application_id = args.application_id;
    let record = tokio::task::spawn_blocking(move || service.review(&application_id, &query))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
