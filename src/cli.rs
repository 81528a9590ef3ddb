// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::auth::{AuthContext, Session};
use crate::config::EnvironmentConfig;
use crate::dashboard;
use crate::types::analysis::{AnalysisData, AnalysisSource};
use crate::ResumeLens;

#[derive(Parser)]
#[command(name = "resumelens")]
#[command(about = "Analyze resumes against the ResumeLens backend and track score history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Signup { email: String, password: String },
    /// Sign in with an existing account
    Login { email: String, password: String },
    /// Sign out and forget the saved session
    Logout,
    /// Submit a resume image or PDF for analysis
    Analyze { file: PathBuf },
    /// Show aggregate statistics over the analysis history
    Dashboard,
    /// List past analyses, newest first
    History,
    /// Show one stored analysis in full
    Show { analysis_id: String },
    /// Show the signed-in user's profile
    Profile,
    /// Follow live changes to the analysis history
    Watch,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = EnvironmentConfig::load()?;
    config.ensure_directories().await?;

    let app = ResumeLens::connect(&config).await?;
    let session_path = config.session_path();
    restore_saved_session(&app, &session_path).await;

    match cli.command {
        Command::Signup { email, password } => {
            let user = app.auth.sign_up(&email, &password).await?;
            save_session(&app, &session_path).await?;
            println!("✓ Account created, signed in as {}", user.email);
        }

        Command::Login { email, password } => {
            let user = app.auth.sign_in(&email, &password).await?;
            save_session(&app, &session_path).await?;
            println!("✓ Signed in as {}", user.email);
        }

        Command::Logout => {
            app.auth.sign_out();
            if session_path.exists() {
                tokio::fs::remove_file(&session_path)
                    .await
                    .context("Failed to remove saved session")?;
            }
            println!("✓ Signed out");
        }

        Command::Analyze { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            let source = source_for_file(&file);

            let record = app.analysis.submit_for_analysis(bytes, source).await?;

            println!("Score: {}/100", record.score);
            println!("{}", record.summary);
            for (i, s) in record.suggestions.iter().enumerate() {
                println!("{}. [{}] {}", i + 1, s.category, s.issue);
                println!("   → {}", s.recommendation);
            }
            if app.auth.current_user().is_some() {
                println!("Saved to history as {}", record.analysis_id);
            } else {
                println!("Not signed in; analysis was not saved to history.");
            }
        }

        Command::Dashboard => {
            let summary = app.analysis.load_dashboard().await?;
            println!("Total edits:       {}", summary.total_edits);
            println!("Total corrections: {}", summary.total_corrections);
            println!("AI checker:        {}%", summary.ai_checker_percent);
            if !summary.recent_series.is_empty() {
                println!("Recent scores (oldest first):");
                for point in &summary.recent_series {
                    println!(
                        "  {}  {:>3}  ({})",
                        point.created_at.format("%Y-%m-%d %H:%M"),
                        point.score,
                        point.analysis_id
                    );
                }
            }
        }

        Command::History => {
            let summary = app.analysis.load_dashboard().await?;
            if summary.history.is_empty() {
                println!("No analyses yet.");
            }
            for item in &summary.history {
                println!(
                    "{:<20} score {:>3}  {} corrections  ({})",
                    item.version_label, item.score, item.suggestion_count, item.analysis_id
                );
            }
        }

        Command::Show { analysis_id } => {
            let record = app.analysis.get_analysis_by_id(&analysis_id).await?;
            println!("Analysis {}", record.analysis_id);
            println!("Submitted as: {}", record.source.as_str());
            println!("Created:      {}", record.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("Score:        {}/100", record.score);
            println!("{}", record.summary);
            for (i, s) in record.suggestions.iter().enumerate() {
                println!("{}. [{}] {}", i + 1, s.category, s.issue);
                println!("   → {}", s.recommendation);
            }
        }

        Command::Profile => {
            let profile = app.profile.load().await?;
            println!("Name:     {}", profile.name.as_deref().unwrap_or("-"));
            println!("Email:    {}", profile.email.as_deref().unwrap_or("-"));
            println!("Username: {}", profile.username.as_deref().unwrap_or("-"));
        }

        Command::Watch => {
            let user = app
                .auth
                .current_user()
                .context("Not signed in. Run `resumelens login` first.")?;
            let mut watch = app.store.watch_analyses(&user.uid);
            println!("Watching analysis history for {} (ctrl-c to stop)", user.email);
            loop {
                let docs = watch.changed().await?;
                let records: Vec<AnalysisData> = docs
                    .iter()
                    .filter_map(|doc| AnalysisData::from_document(doc).ok())
                    .collect();
                let summary = dashboard::aggregate(&records);
                println!(
                    "{} analyses, {} corrections, average score {}%",
                    summary.total_edits, summary.total_corrections, summary.ai_checker_percent
                );
            }
        }
    }

    Ok(())
}

/// Pick the submission channel from the file extension.
fn source_for_file(path: &Path) -> AnalysisSource {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("pdf") => AnalysisSource::Pdf,
        _ => AnalysisSource::Image,
    }
}

async fn restore_saved_session(app: &ResumeLens, session_path: &Path) {
    match tokio::fs::read_to_string(session_path).await {
        Ok(raw) => match serde_json::from_str::<Session>(&raw) {
            Ok(session) => app.auth.restore_session(session),
            Err(e) => warn!("Ignoring unreadable session file: {}", e),
        },
        Err(_) => {} // no saved session
    }
}

async fn save_session(app: &ResumeLens, session_path: &Path) -> Result<()> {
    let Some(session) = app.auth.session_snapshot() else {
        return Ok(());
    };
    let raw = serde_json::to_string(&session).context("Failed to encode session")?;
    tokio::fs::write(session_path, raw)
        .await
        .context("Failed to save session")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_selects_the_pdf_channel() {
        assert_eq!(source_for_file(Path::new("cv.pdf")), AnalysisSource::Pdf);
        assert_eq!(source_for_file(Path::new("CV.PDF")), AnalysisSource::Pdf);
    }

    #[test]
    fn everything_else_is_treated_as_an_image() {
        assert_eq!(source_for_file(Path::new("scan.jpg")), AnalysisSource::Image);
        assert_eq!(source_for_file(Path::new("scan.png")), AnalysisSource::Image);
        assert_eq!(source_for_file(Path::new("noext")), AnalysisSource::Image);
    }
}
