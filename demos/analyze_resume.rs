//! Analyze a resume file from the command line.
//!
//! Usage:
//!   GEMINI_API_KEY=... cargo run --example analyze_resume -- --file resume.pdf

use anyhow::{Context, Result};
use careerhub::{GeminiAnalyzer, ResumeAnalyzer, UploadedDocument};
use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Resume file (pdf, docx, or txt)
    #[arg(long)]
    file: String,
}

fn mime_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "text/plain",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
    let analyzer = GeminiAnalyzer::new(
        "https://generativelanguage.googleapis.com/v1beta",
        "gemini-2.5-flash",
        &api_key,
    );

    let bytes =
        std::fs::read(&args.file).with_context(|| format!("failed to read {}", args.file))?;
    let document = UploadedDocument {
        file_name: args.file.clone(),
        mime_type: mime_for(&args.file).to_string(),
        bytes,
    };

    let analysis = analyzer.analyze(&document).await?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
