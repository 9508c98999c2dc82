//! One-call review generation.
//!
//! Instead of summarizing papers one by one, the whole paper set goes into a
//! single prompt and the model writes the review with numbered citations.

use crate::config::{GenerativeBackend, SurveyConfig};
use crate::error::SurveyError;
use crate::paper::PaperRecord;
use crate::summarizer::bounded;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Generation takes longer than a lookup; it gets this many request timeouts.
const GENERATION_TIMEOUT_FACTOR: u32 = 4;

#[derive(Debug, Serialize)]
struct GenerationBody<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedItem {
    #[serde(default)]
    generated_text: Option<String>,
}

pub struct ReviewGenerator {
    backend: GenerativeBackend,
    client: Client,
    ollama: Ollama,
    model: String,
    endpoint: String,
    token: Option<String>,
    max_new_tokens: u32,
    max_input_chars: usize,
    timeout: Duration,
}

impl ReviewGenerator {
    pub fn from_config(client: &Client, config: &SurveyConfig) -> Self {
        Self {
            backend: config.generator.backend,
            client: client.clone(),
            ollama: ollama_client(&config.generator.ollama_host, config.generator.ollama_port),
            model: config.generator.model.clone(),
            endpoint: config.endpoints.generator.clone(),
            token: config.credentials.generator_token.clone(),
            max_new_tokens: config.generator.max_new_tokens,
            max_input_chars: config.max_input_chars,
            timeout: config.request_timeout * GENERATION_TIMEOUT_FACTOR,
        }
    }

    /// Ask the configured backend for the full review narrative.
    pub async fn generate(&self, topic: &str, papers: &[PaperRecord]) -> Result<String, SurveyError> {
        let prompt = build_prompt(topic, papers, self.max_input_chars);
        debug!("Review prompt is {} chars", prompt.len());

        let text = match self.backend {
            GenerativeBackend::Ollama => self.generate_ollama(prompt).await?,
            GenerativeBackend::HuggingFace => self.generate_hugging_face(&prompt).await?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(SurveyError::SummarizerUnavailable(
                "generator returned an empty review".into(),
            ));
        }

        info!("Generated review: {} words", text.split_whitespace().count());
        Ok(text.to_string())
    }

    async fn generate_ollama(&self, prompt: String) -> Result<String, SurveyError> {
        let request = GenerationRequest::new(self.model.clone(), prompt);

        match tokio::time::timeout(self.timeout, self.ollama.generate(request)).await {
            Ok(Ok(response)) => Ok(response.response),
            Ok(Err(e)) => Err(SurveyError::SummarizerUnavailable(format!("Ollama: {}", e))),
            Err(_) => Err(SurveyError::SummarizerUnavailable(format!(
                "Ollama timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn generate_hugging_face(&self, prompt: &str) -> Result<String, SurveyError> {
        let token = self.token.as_deref().ok_or_else(|| {
            SurveyError::SummarizerUnavailable("no generation token configured".into())
        })?;

        let body = GenerationBody {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.max_new_tokens,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| SurveyError::SummarizerUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SurveyError::SummarizerUnavailable(format!(
                "generator status: {}",
                response.status()
            )));
        }

        let items: Vec<GeneratedItem> = response.json().await.map_err(|e| {
            SurveyError::SummarizerUnavailable(format!("unexpected generator response: {}", e))
        })?;

        items
            .into_iter()
            .next()
            .and_then(|item| item.generated_text)
            .ok_or_else(|| SurveyError::SummarizerUnavailable("response had no generated_text".into()))
    }
}

/// `Ollama::new` panics on hosts it cannot attach a port to, so only
/// http(s) URLs with a host reach it.
fn ollama_client(host: &str, port: u16) -> Ollama {
    match reqwest::Url::parse(host) {
        Ok(url) if usable_ollama_url(&url) => Ollama::new(host.to_string(), port),
        _ => {
            warn!("Invalid Ollama host {:?}, using http://localhost:11434", host);
            Ollama::default()
        }
    }
}

fn usable_ollama_url(url: &reqwest::Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host() && !url.cannot_be_a_base()
}

/// Prompt asking for an 800-word review citing the numbered papers.
pub fn build_prompt(topic: &str, papers: &[PaperRecord], max_abstract_chars: usize) -> String {
    let mut prompt = format!(
        "You are an expert science writer. Write an 800-word, Nature-style literature review on \"{}\".\n\
        Structure it as: Introduction, Current Approaches, Challenges, and Outlook.\n\
        Cite the papers below inline using their numbers in square brackets, e.g. [1] or [2, 3].\n\
        Only cite papers from this list and do not invent references.\n\nPapers:\n",
        topic
    );

    for (i, paper) in papers.iter().enumerate() {
        let abstract_text = if paper.has_abstract() {
            bounded(&paper.abstract_text, max_abstract_chars)
        } else {
            "(no abstract available)"
        };
        // Writing to a String cannot fail.
        let _ = write!(
            prompt,
            "\n[{}] {}\nAbstract: {}\n",
            i + 1,
            paper.title,
            abstract_text
        );
    }

    prompt.push_str("\nReview:\n");
    prompt
}
