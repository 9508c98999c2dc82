// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use anyhow::{Context, Result};
use clap::Parser;
use litsurvey::config::{Args, SurveyConfig};
use litsurvey::export::render_download;
use litsurvey::survey::SurveyGenerator;
use litsurvey::web::start_web_server;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn print_banner(args: &Args, config: &SurveyConfig) {
    println!("{}", "=".repeat(64));
    println!("   LitSurvey: literature survey generator");
    println!("{}", "=".repeat(64));
    println!("\nTopic: {}", args.topic);
    println!(
        "Sources: {}",
        config
            .sources
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Max results per source: {}", config.max_results);
    println!("Mode: {:?}", config.summary_mode);
    println!("Credentials: {:?}", config.credentials);
    println!("Output: {}\n", args.output);
}

// Parse CL arguments, then either serve the web page or run one survey
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = SurveyConfig::from(&args);
    let generator = SurveyGenerator::new(config.clone()).context("failed to initialize survey generator")?;

    if args.web {
        start_web_server(Arc::new(generator), args.port).await;
        return Ok(());
    }

    print_banner(&args, &config);

    let review = match generator.generate_survey(&args.topic).await {
        Ok(review) => review,
        Err(e) => {
            println!("{}", e.user_message());
            return Ok(());
        }
    };

    println!("{}", "=".repeat(64));
    println!("{}", review.to_markdown());
    println!("{}", "=".repeat(64));

    let artifact = render_download(&args.topic, &review, chrono::Local::now());
    fs::write(&args.output, artifact)
        .with_context(|| format!("failed to write {}", args.output))?;
    println!("SAVED to: {}", args.output);

    Ok(())
}
