use thiserror::Error;

/// Every failure a survey request can run into.
///
/// Only `EmptyTopic` and `NoPapersFound` ever end a request; the other
/// variants are recovered where they happen and show up in logs.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("no research topic was given")]
    EmptyTopic,

    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("no papers found for \"{topic}\"")]
    NoPapersFound { topic: String },

    #[error("summarizer unavailable: {0}")]
    SummarizerUnavailable(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl SurveyError {
    pub fn source_unavailable(source_name: &'static str, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Short sentence suitable for showing to the person who asked for the survey.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyTopic => "Please enter a research topic first.".to_string(),
            Self::NoPapersFound { topic } => {
                format!("No papers found for \"{}\". Try a broader topic.", topic)
            }
            Self::SourceUnavailable { source_name, .. } => {
                format!("{} could not be reached. No papers found.", source_name)
            }
            Self::MalformedRecord { .. } | Self::SummarizerUnavailable(_) => {
                "Part of the review could not be generated.".to_string()
            }
            Self::HttpClient(_) => "The survey service is not available right now.".to_string(),
        }
    }
}
