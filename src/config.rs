use clap::{Parser, ValueEnum};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_ARXIV_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_PUBMED_SEARCH_URL: &str =
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const DEFAULT_PUBMED_FETCH_URL: &str =
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
pub const DEFAULT_SUMMARIZER_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";
pub const DEFAULT_GENERATOR_URL: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2";

// CL arguments for config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Literature survey generator for arXiv and PubMed", long_about = None)]
pub struct Args {
    #[arg(short, long, default_value = "")]
    pub topic: String,

    #[arg(short, long, value_enum, value_delimiter = ',', default_value = "arxiv")]
    pub sources: Vec<SourceKind>,

    #[arg(short, long, default_value = "5")]
    pub max_results: usize,

    #[arg(long, value_enum, default_value = "extractive")]
    pub mode: SummaryMode,

    #[arg(long, value_enum, default_value = "narrative")]
    pub layout: ReviewLayout,

    #[arg(long, value_enum, default_value = "fallback")]
    pub missing_credential: MissingCredentialPolicy,

    #[arg(long, default_value = "5")]
    pub concurrency: usize,

    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    #[arg(short, long, default_value = "literature_survey.txt")]
    pub output: String,

    #[arg(long, value_enum, default_value = "ollama")]
    pub backend: GenerativeBackend,

    #[arg(long, default_value = "llama3.2:latest")]
    pub model: String,

    #[arg(long, default_value = "http://localhost")]
    pub ollama_host: String,

    #[arg(long, default_value = "11434")]
    pub ollama_port: u16,

    #[arg(long, default_value = DEFAULT_SUMMARIZER_URL)]
    pub summarizer_url: String,

    #[arg(long, default_value = DEFAULT_GENERATOR_URL)]
    pub generator_url: String,

    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[arg(long, env = "HF_GENERATION_TOKEN", hide_env_values = true)]
    pub hf_generation_token: Option<String>,

    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    pub ncbi_api_key: Option<String>,

    #[arg(long, default_value_t = false)]
    pub web: bool,

    #[arg(long, default_value = "6601")]
    pub port: u16,

    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Bibliographic source queried for papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Arxiv,
    #[value(name = "pubmed")]
    PubMed,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Arxiv => "arXiv",
            Self::PubMed => "PubMed",
        }
    }
}

/// How the papers are turned into prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryMode {
    /// Hosted extractive model per paper, local truncation when it fails.
    Extractive,
    /// Local first-sentences truncation only, no remote calls.
    Local,
    /// One generative call writes the whole review.
    Generative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewLayout {
    Narrative,
    Sections,
}

/// What to do when the extractive summarizer has no token configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingCredentialPolicy {
    Fallback,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenerativeBackend {
    Ollama,
    HuggingFace,
}

#[derive(Clone, Default)]
pub struct Credentials {
    pub summarizer_token: Option<String>,
    pub generator_token: Option<String>,
    pub ncbi_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn shown(value: &Option<String>) -> &'static str {
            if value.is_some() { "<set>" } else { "<unset>" }
        }
        f.debug_struct("Credentials")
            .field("summarizer_token", &shown(&self.summarizer_token))
            .field("generator_token", &shown(&self.generator_token))
            .field("ncbi_api_key", &shown(&self.ncbi_api_key))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backend: GenerativeBackend,
    pub model: String,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub max_new_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GenerativeBackend::Ollama,
            model: "llama3.2:latest".to_string(),
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            max_new_tokens: 1200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub arxiv: String,
    pub pubmed_search: String,
    pub pubmed_fetch: String,
    pub summarizer: String,
    pub generator: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv: DEFAULT_ARXIV_URL.to_string(),
            pubmed_search: DEFAULT_PUBMED_SEARCH_URL.to_string(),
            pubmed_fetch: DEFAULT_PUBMED_FETCH_URL.to_string(),
            summarizer: DEFAULT_SUMMARIZER_URL.to_string(),
            generator: DEFAULT_GENERATOR_URL.to_string(),
        }
    }
}

/// Everything a survey request needs, built once at startup.
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub sources: Vec<SourceKind>,
    pub max_results: usize,
    pub summary_mode: SummaryMode,
    pub layout: ReviewLayout,
    pub missing_credential: MissingCredentialPolicy,
    pub concurrency: usize,
    /// Ceiling applied to any text before it is sent to a remote model.
    pub max_input_chars: usize,
    pub fallback_sentences: usize,
    pub summary_max_length: u32,
    pub request_timeout: Duration,
    pub endpoints: Endpoints,
    pub credentials: Credentials,
    pub generator: GeneratorConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            sources: vec![SourceKind::Arxiv],
            max_results: 5,
            summary_mode: SummaryMode::Extractive,
            layout: ReviewLayout::Narrative,
            missing_credential: MissingCredentialPolicy::Fallback,
            concurrency: 5,
            max_input_chars: 1024,
            fallback_sentences: 3,
            summary_max_length: 130,
            request_timeout: Duration::from_secs(30),
            endpoints: Endpoints::default(),
            credentials: Credentials::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl From<&Args> for SurveyConfig {
    fn from(args: &Args) -> Self {
        let summarizer_token = non_blank(&args.hf_token);
        let generator_token =
            non_blank(&args.hf_generation_token).or_else(|| summarizer_token.clone());

        Self {
            sources: args.sources.clone(),
            max_results: args.max_results.max(1),
            summary_mode: args.mode,
            layout: args.layout,
            missing_credential: args.missing_credential,
            concurrency: args.concurrency.max(1),
            request_timeout: Duration::from_secs(args.timeout_secs),
            endpoints: Endpoints {
                summarizer: args.summarizer_url.clone(),
                generator: args.generator_url.clone(),
                ..Endpoints::default()
            },
            credentials: Credentials {
                summarizer_token,
                generator_token,
                ncbi_api_key: non_blank(&args.ncbi_api_key),
            },
            generator: GeneratorConfig {
                backend: args.backend,
                model: args.model.clone(),
                ollama_host: args.ollama_host.clone(),
                ollama_port: args.ollama_port,
                ..GeneratorConfig::default()
            },
            ..Self::default()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}
