// Minimal browser front end: one topic box, one generate button, one download button.

use crate::error::SurveyError;
use crate::export::{render_download, DOWNLOAD_FILE_NAME};
use crate::paper::ReviewResult;
use crate::survey::SurveyGenerator;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use warp::{Filter, Reply};

#[derive(Debug, Serialize)]
struct StatusMessage {
    status: String,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SurveyReply {
    Review {
        status: String,
        review: ReviewResult,
        markdown: String,
    },
    Message(StatusMessage),
}

impl From<Result<ReviewResult, SurveyError>> for SurveyReply {
    fn from(result: Result<ReviewResult, SurveyError>) -> Self {
        match result {
            Ok(review) => SurveyReply::Review {
                status: "ok".to_string(),
                markdown: review.to_markdown(),
                review,
            },
            Err(e) => {
                let status = match e {
                    SurveyError::EmptyTopic => "warning",
                    _ => "error",
                };
                SurveyReply::Message(StatusMessage {
                    status: status.to_string(),
                    message: e.user_message(),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurveyRequest {
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Deserialize)]
struct DownloadRequest {
    topic: String,
    review: ReviewResult,
}

pub async fn start_web_server(generator: Arc<SurveyGenerator>, port: u16) {
    let generator_filter = warp::any().map(move || generator.clone());

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(index_html()));

    let survey = warp::post()
        .and(warp::path("survey"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(generator_filter)
        .and_then(run_survey);

    let download = warp::post()
        .and(warp::path("download"))
        .and(warp::path::end())
        .and(warp::body::json())
        .map(download_reply);

    let routes = index.or(survey).or(download);

    info!("Web interface running on http://localhost:{}", port);
    warp::serve(routes).run(([127, 0, 0, 1], port)).await;
}

async fn run_survey(
    request: SurveyRequest,
    generator: Arc<SurveyGenerator>,
) -> Result<impl Reply, warp::Rejection> {
    let result = generator.generate_survey(&request.topic).await;
    if let Err(e) = &result {
        info!("Survey for {:?} ended early: {}", request.topic, e);
    }
    Ok(warp::reply::json(&SurveyReply::from(result)))
}

fn download_reply(request: DownloadRequest) -> impl Reply {
    let body = render_download(&request.topic, &request.review, Local::now());
    warp::reply::with_header(
        body,
        "content-disposition",
        format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
    )
}

fn index_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>LitSurvey</title>
    <style>
        body { font-family: Arial; margin: 20px; background: #f5f5f5; }
        h1 { color: #333; }
        .search-form { background: white; padding: 20px; max-width: 800px; }
        input[type="text"] { padding: 8px; width: 100%; box-sizing: border-box; margin: 5px 0; }
        button { padding: 8px 16px; background: rgb(100, 149, 237); color: white; border: none; cursor: pointer; margin-right: 5px; }
        button:hover { background: #5a8dd4; }
        button:disabled { background: #aaa; cursor: default; }
        .status-message { padding: 10px; margin: 10px 0; display: none; }
        .status-message.warning { display: block; background: #fff3cd; border: 1px solid #ffc107; }
        .status-message.error { display: block; background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }
        .status-message.info { display: block; background: #e9ecef; border: 1px solid #ddd; }
        .review { background: white; padding: 15px; margin: 10px 0; border: 1px solid #ddd; max-width: 800px; white-space: pre-wrap; display: none; }
    </style>
</head>
<body>
    <h1>LitSurvey</h1>
    <div class="search-form">
        <label for="topic"><b>Research topic</b></label>
        <input type="text" id="topic" placeholder="e.g., Electrochemistry for wearable sensors">
        <button id="generate" onclick="generateSurvey()">Generate Literature Survey</button>
        <button id="download" onclick="downloadSurvey()" disabled>Download</button>
    </div>
    <div id="status" class="status-message"></div>
    <div id="review" class="review"></div>

    <script>
        let lastTopic = null;
        let lastReview = null;

        function showStatus(kind, message) {
            const status = document.getElementById('status');
            status.className = 'status-message ' + kind;
            status.textContent = message;
        }

        function generateSurvey() {
            const topic = document.getElementById('topic').value;
            const button = document.getElementById('generate');
            const review = document.getElementById('review');
            button.disabled = true;
            review.style.display = 'none';
            showStatus('info', 'Brewing your literature review...');

            fetch('/survey', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ topic: topic })
            })
            .then(r => r.json())
            .then(data => {
                if (data.status === 'ok') {
                    lastTopic = topic;
                    lastReview = data.review;
                    review.textContent = data.markdown;
                    review.style.display = 'block';
                    document.getElementById('status').className = 'status-message';
                    document.getElementById('download').disabled = false;
                } else {
                    showStatus(data.status, data.message);
                }
            })
            .catch(() => showStatus('error', 'The survey service is not available right now.'))
            .finally(() => { button.disabled = false; });
        }

        function downloadSurvey() {
            if (!lastReview) return;
            fetch('/download', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ topic: lastTopic, review: lastReview })
            })
            .then(r => r.blob())
            .then(blob => {
                const link = document.createElement('a');
                link.href = URL.createObjectURL(blob);
                link.download = 'literature_survey.txt';
                link.click();
                URL.revokeObjectURL(link.href);
            });
        }
    </script>
</body>
</html>"#
        .to_string()
}
