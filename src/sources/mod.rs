//! Paper source adapters
//!
//! Each adapter turns a topic into normalized [`PaperRecord`]s. Sources are
//! queried one after another in the configured order and their results are
//! concatenated in that order.

mod arxiv;
mod pubmed;

pub use arxiv::ArxivSource;
pub use pubmed::PubMedSource;

use crate::config::{SourceKind, SurveyConfig};
use crate::error::SurveyError;
use crate::paper::PaperRecord;
use reqwest::Client;
use tracing::{info, warn};

pub enum PaperSource {
    Arxiv(ArxivSource),
    PubMed(PubMedSource),
}

impl PaperSource {
    pub fn from_kind(kind: SourceKind, client: &Client, config: &SurveyConfig) -> Self {
        match kind {
            SourceKind::Arxiv => Self::Arxiv(ArxivSource::new(
                client.clone(),
                config.endpoints.arxiv.clone(),
            )),
            SourceKind::PubMed => Self::PubMed(PubMedSource::new(
                client.clone(),
                config.endpoints.pubmed_search.clone(),
                config.endpoints.pubmed_fetch.clone(),
                config.credentials.ncbi_api_key.clone(),
            )),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Arxiv(_) => SourceKind::Arxiv,
            Self::PubMed(_) => SourceKind::PubMed,
        }
    }

    pub async fn fetch(&self, topic: &str, limit: usize) -> Result<Vec<PaperRecord>, SurveyError> {
        match self {
            Self::Arxiv(source) => source.fetch(topic, limit).await,
            Self::PubMed(source) => source.fetch(topic, limit).await,
        }
    }
}

/// The configured sources, in concatenation order.
pub struct PaperSources {
    sources: Vec<PaperSource>,
}

impl PaperSources {
    pub fn new(sources: Vec<PaperSource>) -> Self {
        Self { sources }
    }

    pub fn from_config(client: &Client, config: &SurveyConfig) -> Self {
        Self::new(
            config
                .sources
                .iter()
                .map(|kind| PaperSource::from_kind(*kind, client, config))
                .collect(),
        )
    }

    /// Fetch up to `limit` papers from every source and concatenate them.
    ///
    /// A failing source contributes nothing; only an empty overall result
    /// is reported as an error.
    pub async fn fetch_all(
        &self,
        topic: &str,
        limit: usize,
    ) -> Result<Vec<PaperRecord>, SurveyError> {
        let mut papers = Vec::new();

        for source in &self.sources {
            match source.fetch(topic, limit).await {
                Ok(found) => {
                    info!("{}: {} papers", source.kind().name(), found.len());
                    papers.extend(found);
                }
                Err(e) => warn!("Skipping {}: {}", source.kind().name(), e),
            }
        }

        if papers.is_empty() {
            return Err(SurveyError::NoPapersFound {
                topic: topic.to_string(),
            });
        }
        Ok(papers)
    }
}

/// Slices of `xml`, one per `<name ...>...</name>` element, in document order.
///
/// Records are cut apart before parsing so a broken one cannot take its
/// neighbours down with it. An element missing its end tag runs to the end
/// of the input.
pub(crate) fn element_slices<'a>(xml: &'a str, name: &str) -> Vec<&'a str> {
    let open = format!("<{}", name);
    let close = format!("</{}>", name);
    let mut slices = Vec::new();
    let mut rest = xml;

    while let Some(start) = find_start_tag(rest, &open) {
        let element = &rest[start..];
        let end = element
            .find(&close)
            .map(|i| i + close.len())
            .unwrap_or(element.len());
        slices.push(&element[..end]);
        rest = &element[end..];
    }
    slices
}

// `<entry` must not match `<entrySet`, so the tag name has to end right there.
fn find_start_tag(xml: &str, open: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(i) = xml[offset..].find(open) {
        let at = offset + i;
        match xml[at + open.len()..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => return Some(at),
            _ => offset = at + open.len(),
        }
    }
    None
}
