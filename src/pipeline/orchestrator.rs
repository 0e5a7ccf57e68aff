use chrono::Utc;

use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient, client};
use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_SOURCES, REPORT_TRADE_ROWS,
};

use super::ResearchConfig;
use super::normalize::{self, ParseOutcome, ResearchReport};
use super::prompt;

/// Acquire one research report. Stateless and re-entrant: concurrent
/// calls share nothing but the read-only configuration.
#[tracing::instrument(
    name = "pipeline research",
    skip(llm_client, config),
    fields(
        research.regions = config.regions.len(),
        research.industries = config.industries.len(),
        research.depth = config.depth.as_str(),
        report.trade_rows,
        report.sources,
        report.recovered,
        report.duration_ms,
    )
)]
pub async fn research_report(
    llm_client: &LlmClient,
    model: &str,
    thinking_budget: u32,
    config: &ResearchConfig,
) -> Result<ResearchReport, AppError> {
    let start = std::time::Instant::now();

    // Stage 1: render the config into the instruction prompt.
    let prompt = prompt::build_prompt(config);

    // Stage 2: single grounded generation call. Transport and service
    // failures classify into the three caller-visible kinds.
    let resp = llm_client
        .generate(&GenerateRequest {
            model: model.to_string(),
            prompt,
            web_search: true,
            thinking_budget,
        })
        .await
        .map_err(client::classify_failure)?;

    // Stage 3: parse and sanitize the body. An unparseable response
    // degrades to the fallback body instead of failing the acquisition.
    let ParseOutcome { body, recovered } = normalize::parse_report_body(&resp.content);

    // Stage 4: citations come from the grounding side-channel, not the
    // body; the timestamp is local acquisition time.
    let sources = normalize::dedup_sources(resp.citations);

    let report = ResearchReport {
        body,
        sources,
        generated_at: Utc::now(),
    };

    let duration = start.elapsed();
    REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[]);
    REPORT_TRADE_ROWS.record(report.body.trade_data.len() as f64, &[]);
    REPORT_SOURCES.record(report.sources.len() as f64, &[]);

    let span = tracing::Span::current();
    span.record("report.trade_rows", report.body.trade_data.len());
    span.record("report.sources", report.sources.len());
    span.record("report.recovered", recovered);
    span.record("report.duration_ms", duration.as_millis() as u64);

    Ok(report)
}
