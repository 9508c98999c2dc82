//! Per-paper summarization with a fallback chain.
//!
//! The hosted extractive model is tried first; anything that goes wrong with
//! it ends in the local first-sentences strategy, so `summarize` always
//! returns text.

use crate::config::{MissingCredentialPolicy, SummaryMode, SurveyConfig};
use crate::error::SurveyError;
use crate::paper::collapse_whitespace;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const NO_SUMMARY: &str = "No summary available.";
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("sentence regex is valid"));

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: SummaryParameters,
}

#[derive(Debug, Serialize)]
struct SummaryParameters {
    max_length: u32,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    #[serde(default)]
    summary_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStrategy {
    Extractive,
    Local,
}

pub struct Summarizer {
    client: Client,
    strategy: SummaryStrategy,
    endpoint: String,
    token: Option<String>,
    missing_credential: MissingCredentialPolicy,
    max_input_chars: usize,
    fallback_sentences: usize,
    max_length: u32,
}

impl Summarizer {
    pub fn from_config(client: &Client, config: &SurveyConfig) -> Self {
        // Generative mode still needs per-paper summaries when the
        // generator fails, so it keeps the extractive chain behind it.
        let strategy = match config.summary_mode {
            SummaryMode::Local => SummaryStrategy::Local,
            SummaryMode::Extractive | SummaryMode::Generative => SummaryStrategy::Extractive,
        };

        Self {
            client: client.clone(),
            strategy,
            endpoint: config.endpoints.summarizer.clone(),
            token: config.credentials.summarizer_token.clone(),
            missing_credential: config.missing_credential,
            max_input_chars: config.max_input_chars,
            fallback_sentences: config.fallback_sentences,
            max_length: config.summary_max_length,
        }
    }

    /// Summarize `text`. Never fails; empty input makes no remote call.
    pub async fn summarize(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return NO_SUMMARY.to_string();
        }

        if self.strategy == SummaryStrategy::Local {
            return self.local(text);
        }

        let Some(token) = self.token.as_deref() else {
            return match self.missing_credential {
                MissingCredentialPolicy::Fallback => {
                    debug!("No summarizer token configured, using first sentences");
                    self.local(text)
                }
                MissingCredentialPolicy::Sentinel => SUMMARY_UNAVAILABLE.to_string(),
            };
        };

        match self.summarize_remote(text, token).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("{}; falling back to first sentences", e);
                self.local(text)
            }
        }
    }

    async fn summarize_remote(&self, text: &str, token: &str) -> Result<String, SurveyError> {
        let request = SummaryRequest {
            inputs: bounded(text, self.max_input_chars),
            parameters: SummaryParameters {
                max_length: self.max_length,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SurveyError::SummarizerUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SurveyError::SummarizerUnavailable(format!(
                "status: {}",
                response.status()
            )));
        }

        let items: Vec<SummaryItem> = response
            .json()
            .await
            .map_err(|e| SurveyError::SummarizerUnavailable(format!("unexpected response: {}", e)))?;

        items
            .into_iter()
            .next()
            .and_then(|item| item.summary_text)
            .map(|summary| collapse_whitespace(&summary))
            .filter(|summary| !summary.is_empty())
            .ok_or_else(|| SurveyError::SummarizerUnavailable("response had no summary_text".into()))
    }

    fn local(&self, text: &str) -> String {
        first_sentences(text, self.fallback_sentences)
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn bounded(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// The first `count` sentences of `text`, split on `.`, `!` or `?` followed by whitespace.
pub fn first_sentences(text: &str, count: usize) -> String {
    let text = collapse_whitespace(text);
    let count = count.max(1);

    let end = SENTENCE_END
        .find_iter(&text)
        .nth(count - 1)
        .map(|m| m.start() + m.as_str().trim_end().len())
        .unwrap_or(text.len());

    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    const ABSTRACT: &str = "Sweat carries lactate. We built a patch! Does it work? Yes, for days.";

    fn summarizer(server: &ServerGuard, token: Option<&str>) -> Summarizer {
        let mut config = SurveyConfig::default();
        config.endpoints.summarizer = format!("{}/summarize", server.url());
        config.credentials.summarizer_token = token.map(str::to_string);
        Summarizer::from_config(&Client::new(), &config)
    }

    #[test]
    fn test_first_sentences() {
        assert_eq!(
            first_sentences(ABSTRACT, 3),
            "Sweat carries lactate. We built a patch! Does it work?"
        );
        assert_eq!(first_sentences(ABSTRACT, 1), "Sweat carries lactate.");
        assert_eq!(first_sentences("No terminator at all", 3), "No terminator at all");
        assert_eq!(
            first_sentences("Noise fell to 3.5 mV. Drift was low.", 1),
            "Noise fell to 3.5 mV."
        );
        assert_eq!(first_sentences("Line one.\n\nLine two.", 5), "Line one. Line two.");
    }

    #[test]
    fn test_bounded_respects_char_boundaries() {
        assert_eq!(bounded("héllo", 2), "hé");
        assert_eq!(bounded("short", 100), "short");
        assert_eq!(bounded("", 3), "");
    }

    #[tokio::test]
    async fn test_remote_summary_used_when_available() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::PartialJson(json!({
                "inputs": ABSTRACT,
                "parameters": {"max_length": 130}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"summary_text": "A lactate patch works for days."}]"#)
            .expect(1)
            .create_async()
            .await;

        let summary = summarizer(&server, Some("hf_test")).summarize(ABSTRACT).await;

        mock.assert_async().await;
        assert_eq!(summary, "A lactate patch works for days.");
    }

    #[tokio::test]
    async fn test_long_input_is_bounded_before_dispatch() {
        let long_text = "word ".repeat(400);
        let expected = bounded(long_text.trim(), 1024).to_string();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .match_body(Matcher::PartialJson(json!({ "inputs": expected })))
            .with_status(200)
            .with_body(r#"[{"summary_text": "Words."}]"#)
            .expect(1)
            .create_async()
            .await;

        let summary = summarizer(&server, Some("hf_test")).summarize(&long_text).await;

        mock.assert_async().await;
        assert_eq!(summary, "Words.");
    }

    #[tokio::test]
    async fn test_server_error_falls_back_to_first_sentences() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/summarize")
            .with_status(503)
            .with_body(r#"{"error": "Model is currently loading"}"#)
            .create_async()
            .await;

        let summary = summarizer(&server, Some("hf_test")).summarize(ABSTRACT).await;
        assert_eq!(summary, first_sentences(ABSTRACT, 3));
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/summarize")
            .with_status(200)
            .with_body(r#"[{"label": "POSITIVE"}]"#)
            .create_async()
            .await;

        let summary = summarizer(&server, Some("hf_test")).summarize(ABSTRACT).await;
        assert_eq!(summary, first_sentences(ABSTRACT, 3));
    }

    #[tokio::test]
    async fn test_unreachable_backend_falls_back() {
        let mut config = SurveyConfig::default();
        // Nothing listens on the discard port.
        config.endpoints.summarizer = "http://127.0.0.1:9/summarize".to_string();
        config.credentials.summarizer_token = Some("hf_test".to_string());
        let summarizer = Summarizer::from_config(&Client::new(), &config);

        assert_eq!(summarizer.summarize(ABSTRACT).await, first_sentences(ABSTRACT, 3));
    }

    #[tokio::test]
    async fn test_missing_token_follows_policy_without_calling_backend() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .expect(0)
            .create_async()
            .await;

        let fallback = summarizer(&server, None);
        assert_eq!(fallback.summarize(ABSTRACT).await, first_sentences(ABSTRACT, 3));

        let mut sentinel = summarizer(&server, None);
        sentinel.missing_credential = MissingCredentialPolicy::Sentinel;
        assert_eq!(sentinel.summarize(ABSTRACT).await, SUMMARY_UNAVAILABLE);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .expect(0)
            .create_async()
            .await;

        let summary = summarizer(&server, Some("hf_test")).summarize("   ").await;

        mock.assert_async().await;
        assert_eq!(summary, NO_SUMMARY);
    }

    #[tokio::test]
    async fn test_local_strategy_never_calls_backend() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .expect(0)
            .create_async()
            .await;

        let mut config = SurveyConfig {
            summary_mode: SummaryMode::Local,
            ..SurveyConfig::default()
        };
        config.endpoints.summarizer = format!("{}/summarize", server.url());
        config.credentials.summarizer_token = Some("hf_test".to_string());
        let summarizer = Summarizer::from_config(&Client::new(), &config);

        assert_eq!(summarizer.strategy, SummaryStrategy::Local);
        assert_eq!(summarizer.summarize(ABSTRACT).await, first_sentences(ABSTRACT, 3));
        mock.assert_async().await;
    }
}
