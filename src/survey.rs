//! Request-scoped survey pipeline: fetch, summarize, compose.

use crate::composer::{compose, compose_generated};
use crate::config::{SummaryMode, SurveyConfig};
use crate::error::SurveyError;
use crate::generative::ReviewGenerator;
use crate::paper::{PaperRecord, ReviewResult, SummarizedPaper};
use crate::sources::PaperSources;
use crate::summarizer::Summarizer;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{info, warn};

/// Builds literature surveys. Holds only read-only state, so one instance
/// can serve any number of requests, concurrently or not.
pub struct SurveyGenerator {
    config: SurveyConfig,
    sources: PaperSources,
    summarizer: Summarizer,
    generator: ReviewGenerator,
}

impl SurveyGenerator {
    pub fn new(config: SurveyConfig) -> Result<Self, SurveyError> {
        let client = Client::builder()
            .user_agent(concat!("litsurvey/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            sources: PaperSources::from_config(&client, &config),
            summarizer: Summarizer::from_config(&client, &config),
            generator: ReviewGenerator::from_config(&client, &config),
            config,
        })
    }

    /// Run one survey for `topic`.
    ///
    /// Fails only with `EmptyTopic` (no network calls are made) or
    /// `NoPapersFound`; every other failure degrades inside the pipeline.
    pub async fn generate_survey(&self, topic: &str) -> Result<ReviewResult, SurveyError> {
        let topic = topic.trim();
        if topic.is_empty() {
            warn!("Survey requested without a topic");
            return Err(SurveyError::EmptyTopic);
        }

        info!("Brewing a literature review on \"{}\"", topic);
        let papers = self.sources.fetch_all(topic, self.config.max_results).await?;
        info!("Fetched {} papers", papers.len());

        if self.config.summary_mode == SummaryMode::Generative {
            match self.generator.generate(topic, &papers).await {
                Ok(narrative) => return Ok(compose_generated(narrative, &papers)),
                Err(e) => warn!("{}; summarizing papers one by one instead", e),
            }
        }

        let summarized = self.summarize_papers(papers).await;
        Ok(compose(topic, &summarized, self.config.layout))
    }

    /// Summarize every paper with at most `concurrency` calls in flight.
    ///
    /// Output order is input order, whatever order the calls finish in.
    pub async fn summarize_papers(&self, papers: Vec<PaperRecord>) -> Vec<SummarizedPaper> {
        stream::iter(papers)
            .map(|paper| async move {
                let summary = self.summarizer.summarize(&paper.abstract_text).await;
                SummarizedPaper::new(paper, summary)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }
}
