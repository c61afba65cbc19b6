//! CLI handlers for one-shot meeting commands.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{AskCliArgs, ListCliArgs, ShowCliArgs, UploadCliArgs};
use crate::cli::watch::follow;
use crate::config::Config;
use crate::jobs::{JobId, JobRecord, PollScheduler};
use crate::remote::mime_type_for_extension;

use super::{build_client, build_fetcher};

pub async fn handle_list_command(config: &Config, args: ListCliArgs) -> Result<()> {
    let client = build_client(config)?;
    let meetings = client.list(args.skip, args.limit).await?;

    if meetings.is_empty() {
        println!("No meetings uploaded yet.");
        return Ok(());
    }

    for meeting in meetings {
        println!(
            "#{} {} [{}]",
            meeting.id, meeting.display_name, meeting.status
        );
    }

    Ok(())
}

pub async fn handle_show_command(config: &Config, args: ShowCliArgs) -> Result<()> {
    let client = build_client(config)?;
    let meeting = client.meeting(&JobId::new(args.id)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meeting)?);
        return Ok(());
    }

    print!("{}", format_meeting(&meeting, args.transcript));
    Ok(())
}

pub async fn handle_ask_command(config: &Config, args: AskCliArgs) -> Result<()> {
    if args.question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let client = build_client(config)?;
    let answer = client.ask(&JobId::new(args.id), &args.question).await?;

    println!("{}", answer);
    Ok(())
}

pub async fn handle_upload_command(config: &Config, args: UploadCliArgs) -> Result<()> {
    validate_file(&args.file)?;

    let client = Arc::new(build_client(config)?);
    let record = client
        .upload(&args.file)
        .await
        .context("Failed to upload recording")?;

    println!(
        "Uploaded {} as meeting #{} ({})",
        record.display_name, record.id, record.status
    );

    if !args.watch {
        return Ok(());
    }

    let handle = PollScheduler::new(build_fetcher(config, client), config.polling.interval()).spawn();
    handle.track(record)?;
    follow(&handle, !args.no_progress).await?;
    handle.stop().await?;

    Ok(())
}

/// Validate that the file exists and has a supported format.
fn validate_file(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    if mime_type_for_extension(ext).is_none() {
        bail!(
            "Unsupported format: .{}\nSupported formats: wav, mp3, m4a, flac, ogg, opus, mp4, mkv, webm, avi, mov",
            ext,
        );
    }

    Ok(())
}

fn format_meeting(meeting: &JobRecord, with_transcript: bool) -> String {
    let mut out = format!(
        "Meeting #{}: {}\nStatus: {}\n",
        meeting.id, meeting.display_name, meeting.status
    );

    let Some(insights) = &meeting.insights else {
        return out;
    };

    if let Some(summary) = &insights.summary {
        out.push_str(&format!("\nSummary:\n{}\n", summary));
    }
    if !insights.participants.is_empty() {
        out.push_str(&format!("\nParticipants: {}\n", insights.participants.join(", ")));
    }
    if let Some(sentiment) = &insights.sentiment {
        out.push_str(&format!("Sentiment: {}\n", sentiment));
    }
    if !insights.decisions.is_empty() {
        out.push_str("\nDecisions:\n");
        for decision in &insights.decisions {
            out.push_str(&format!("  - {}\n", decision));
        }
    }
    if !insights.action_items.is_empty() {
        out.push_str("\nAction items:\n");
        for item in &insights.action_items {
            out.push_str(&format!("  - {} ({})\n", item.task, item.assigned_to));
        }
    }
    if !insights.keywords.is_empty() {
        let keywords: Vec<String> = insights
            .keywords
            .iter()
            .map(|k| format!("{} ({})", k.keyword, k.count))
            .collect();
        out.push_str(&format!("\nKeywords: {}\n", keywords.join(", ")));
    }
    if with_transcript {
        if let Some(transcript) = &insights.transcript {
            out.push_str(&format!("\n--- Transcript ---\n{}\n", transcript));
        }
    }

    out
}
