//! Literature survey generator.
//!
//! Takes a research topic, fetches papers from arXiv and/or PubMed, summarizes
//! their abstracts and composes a short citation-linked review.

pub mod composer;
pub mod config;
pub mod error;
pub mod export;
pub mod generative;
pub mod paper;
pub mod sources;
pub mod summarizer;
pub mod survey;
pub mod web;

pub use config::{Args, SurveyConfig};
pub use error::SurveyError;
pub use paper::{PaperRecord, Reference, ReviewResult, SummarizedPaper};
pub use survey::SurveyGenerator;
