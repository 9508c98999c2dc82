//! Paper records shared by every stage of a survey request.
//!
//! Provider payloads are normalized into [`PaperRecord`] at the adapter
//! boundary; nothing downstream sees raw XML or JSON.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const UNTITLED: &str = "Untitled";
pub const NO_URL: &str = "#";

/// One retrieved publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
}

impl PaperRecord {
    /// Build a record from whatever fields the provider returned.
    ///
    /// Title and url fall back to placeholders so they are always present;
    /// a missing abstract becomes an empty string.
    pub fn normalized(title: Option<&str>, abstract_text: Option<&str>, url: Option<&str>) -> Self {
        Self {
            title: non_blank(title).unwrap_or_else(|| UNTITLED.to_string()),
            abstract_text: non_blank(abstract_text).unwrap_or_default(),
            url: non_blank(url).unwrap_or_else(|| NO_URL.to_string()),
        }
    }

    pub fn has_abstract(&self) -> bool {
        !self.abstract_text.is_empty()
    }
}

/// A paper with the summary attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedPaper {
    pub paper: PaperRecord,
    pub summary: String,
}

impl SummarizedPaper {
    pub fn new(paper: PaperRecord, summary: String) -> Self {
        Self { paper, summary }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

impl From<&PaperRecord> for Reference {
    fn from(paper: &PaperRecord) -> Self {
        Self {
            title: paper.title.clone(),
            url: paper.url.clone(),
        }
    }
}

/// The finished review handed back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub narrative: String,
    pub references: Vec<Reference>,
}

impl ReviewResult {
    /// Narrative followed by a numbered references section of markdown links.
    pub fn to_markdown(&self) -> String {
        let mut out = self.narrative.trim_end().to_string();
        if self.references.is_empty() {
            return out;
        }

        out.push_str("\n\n## References\n\n");
        for (i, reference) in self.references.iter().enumerate() {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}. [{}]({})", i + 1, reference.title, reference.url);
        }
        out
    }
}

/// Collapse every whitespace run (newlines included) into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(collapse_whitespace).filter(|s| !s.is_empty())
}
