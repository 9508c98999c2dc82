use crate::paper::ReviewResult;
use chrono::{DateTime, Local};

pub const DOWNLOAD_FILE_NAME: &str = "literature_survey.txt";

/// Plain-text download: header lines, then the review as markdown.
pub fn render_download(topic: &str, review: &ReviewResult, generated_at: DateTime<Local>) -> String {
    let separator = "=".repeat(70);
    format!(
        "Literature Survey: {}\nGenerated: {}\n{}\n\n{}\n",
        topic.trim(),
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        separator,
        review.to_markdown()
    )
}
