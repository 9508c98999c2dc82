//! Turns summarized papers into the final review.

use crate::config::ReviewLayout;
use crate::paper::{PaperRecord, Reference, ReviewResult, SummarizedPaper};

pub fn compose(topic: &str, summarized: &[SummarizedPaper], layout: ReviewLayout) -> ReviewResult {
    let narrative = match layout {
        ReviewLayout::Narrative => stitch(topic, summarized),
        ReviewLayout::Sections => sections(summarized),
    };

    ReviewResult {
        narrative,
        references: summarized.iter().map(|s| Reference::from(&s.paper)).collect(),
    }
}

/// Review written in one generative call; references follow paper order.
pub fn compose_generated(narrative: String, papers: &[PaperRecord]) -> ReviewResult {
    ReviewResult {
        narrative,
        references: papers.iter().map(Reference::from).collect(),
    }
}

fn stitch(topic: &str, summarized: &[SummarizedPaper]) -> String {
    let body = summarized
        .iter()
        .map(|s| s.summary.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{}\n\n{}\n\n{}",
        introduction(topic, summarized.len()),
        body,
        conclusion(topic)
    )
}

fn sections(summarized: &[SummarizedPaper]) -> String {
    summarized
        .iter()
        .map(|s| {
            format!(
                "### {}\n\n{}\n\n[Read more]({})",
                s.paper.title,
                s.summary.trim(),
                s.paper.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn introduction(topic: &str, count: usize) -> String {
    let studies = if count == 1 { "study" } else { "studies" };
    format!(
        "This review surveys recent research on {}, drawing on {} {}.",
        topic, count, studies
    )
}

fn conclusion(topic: &str) -> String {
    format!(
        "Together, these works outline the current state of research on {} and point to open questions for future study.",
        topic
    )
}
