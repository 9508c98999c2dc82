//! arXiv search over the public Atom API.
//!
//! One GET returns the whole feed; every readable `<entry>` becomes a
//! [`PaperRecord`].
//! See: https://info.arxiv.org/help/api/user-manual.html

use super::element_slices;
use crate::error::SurveyError;
use crate::paper::PaperRecord;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SOURCE_NAME: &str = "arXiv";

#[derive(Debug, Deserialize)]
struct Entry {
    /// Abstract page URL (e.g., "http://arxiv.org/abs/2301.07041v1")
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    /// The abstract
    #[serde(default)]
    summary: Option<String>,
}

impl Entry {
    fn into_record(self) -> PaperRecord {
        PaperRecord::normalized(
            self.title.as_deref(),
            self.summary.as_deref(),
            self.id.as_deref(),
        )
    }
}

pub struct ArxivSource {
    client: Client,
    url: String,
}

impl ArxivSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn fetch(&self, topic: &str, limit: usize) -> Result<Vec<PaperRecord>, SurveyError> {
        let search_query = format!("all:{}", topic);
        let params = [
            ("search_query", search_query),
            ("start", "0".to_string()),
            ("max_results", limit.to_string()),
        ];

        debug!("arXiv search: {} {:?}", self.url, params);

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(SurveyError::source_unavailable(
                SOURCE_NAME,
                format!("status: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SurveyError::source_unavailable(SOURCE_NAME, e))?;

        let mut papers = parse_feed(&body)?;
        papers.truncate(limit);
        debug!("arXiv returned {} papers", papers.len());
        Ok(papers)
    }
}

/// Parse an Atom feed into records, one `<entry>` at a time.
///
/// An entry that does not deserialize is skipped; only a body that is not a
/// feed at all fails the fetch.
fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>, SurveyError> {
    if element_slices(xml, "feed").is_empty() {
        return Err(SurveyError::source_unavailable(
            SOURCE_NAME,
            "response is not an Atom feed",
        ));
    }

    let papers = element_slices(xml, "entry")
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match quick_xml::de::from_str::<Entry>(entry) {
            Ok(entry) => Some(entry.into_record()),
            Err(e) => {
                debug!("Skipping arXiv entry {}: {}", i + 1, e);
                None
            }
        })
        .collect();
    Ok(papers)
}
